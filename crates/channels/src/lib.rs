//! Chat-platform channel implementations for blockpilot.
//!
//! Each channel delivers slash-style command interactions and carries the
//! replies back. Channels are trait-based and platform-agnostic.
//!
//! Available channels:
//! - **Discord**: Discord slash commands (stub, needs serenity in production)
//! - **Console**: `/command name:value` lines typed on stdin
//! - **Registry**: Central channel manager merging interaction streams

pub mod console;
pub mod discord;
pub mod registry;

pub use console::ConsoleChannel;
pub use discord::{DiscordChannel, DiscordConfig, OutboundMessage, SlashCommand};
pub use registry::{ChannelRegistry, Inbound};
