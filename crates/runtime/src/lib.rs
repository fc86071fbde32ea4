//! # blockpilot runtime
//!
//! Wires a world session to its chat surfaces:
//! - [`Supervisor`] connects, watches the session and reconnects after death
//!   or disconnect.
//! - [`Reactor`] handles world signals: the combat reflex and in-game help.
//! - [`Dispatcher`] routes chat-platform interactions to commands, applying
//!   cooldowns and the allowlist.
//!
//! The three share the live session through a [`SessionSlot`].

pub mod dispatcher;
pub mod help;
pub mod reactor;
pub mod session;
pub mod settings;
pub mod supervisor;

pub use dispatcher::Dispatcher;
pub use reactor::{Reaction, Reactor, Retaliation};
pub use session::{Session, SessionSlot};
pub use settings::{BehaviorSettings, RuntimeSettings};
pub use supervisor::{Supervisor, SupervisorState};

/// Resolves once `shutdown` turns true or its sender is dropped.
pub(crate) async fn shutdown_requested(shutdown: &mut tokio::sync::watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
