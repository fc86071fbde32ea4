//! # blockpilot core
//!
//! Domain types, traits, and error definitions for the blockpilot agent.
//! This crate has **no transport dependencies**: it defines the domain model
//! that every other crate implements against.
//!
//! ## Collaborator seams
//!
//! The agent drives three external collaborators, each defined as a trait here:
//! - [`World`]: the game-world model (blocks, inventory, entities, navigation
//!   engine signals) reached through a live session.
//! - [`Channel`]: the chat platform that delivers slash-style commands and
//!   receives replies, follow-ups and embeds.
//! - [`Navigation`]: goal-seeking movement with obstacle recovery.
//!
//! Implementations live in their respective crates, which keeps the
//! dependency graph pointing inward and lets tests swap in simulated parts.

pub mod channel;
pub mod command;
pub mod error;
pub mod event;
pub mod navigation;
pub mod world;

// Re-export key types at crate root for ergonomics
pub use channel::{
    Channel, ChannelId, Embed, EmbedField, Interaction, InteractionResponder, MessageBody,
    ReplyKind, Responder,
};
pub use command::{Command, CommandContext, CommandOption, CommandRegistry};
pub use error::{ChannelError, CommandError, Error, Result, WorldError};
pub use event::{EventBus, Subscription};
pub use navigation::{
    Goal, GoalId, GoalRun, Navigation, NavigationObserver, NavigationOutcome, ObstacleCause,
    ObstacleReport, SilentObserver,
};
pub use world::{
    Block, BlockQuery, Coordinate, Entity, EntityId, EntityKind, EquipSlot, GoalNear, Item,
    Movements, Offset, PathStatus, Position, SessionFactory, World, WorldEvent,
};
