//! Error types for the blockpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all blockpilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- World-model errors ---
    #[error("World error: {0}")]
    World(#[from] WorldError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Command errors ---
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the game-world collaborator.
///
/// Action calls (dig, place, equip, attack) surface these instead of failing
/// silently; callers decide whether to log and continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("Not connected to the game server")]
    NotConnected,

    #[error("Could not connect to {address}: {reason}")]
    ConnectFailed { address: String, reason: String },

    #[error("Action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("Target at {0} is out of reach")]
    OutOfReach(String),

    #[error("No block at {0}")]
    NoSuchBlock(String),

    #[error("Session closed: {0}")]
    SessionClosed(String),
}

impl WorldError {
    pub fn action(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ActionFailed {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Unauthorized sender: {sender_id} on {channel}")]
    Unauthorized { channel: String, sender_id: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid interaction payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid command arguments: {0}")]
    InvalidArguments(String),

    #[error("The bot is not connected to the game server")]
    NotConnected,

    #[error("Command '{command}' is on cooldown for another {remaining_secs}s")]
    CooldownActive { command: String, remaining_secs: u64 },

    #[error("Command execution failed: {command}: {reason}")]
    ExecutionFailed { command: String, reason: String },

    #[error("Reply failed: {0}")]
    Channel(#[from] ChannelError),
}
