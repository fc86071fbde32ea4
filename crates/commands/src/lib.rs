//! Built-in chat commands.
//!
//! - `pathfinder`: navigate to a coordinate with obstacle recovery
//! - `position`: report where the agent stands
//! - `stop`: abandon the active goal
//!
//! [`default_registry`] registers them in that order; the order is what
//! `help` lists.

pub mod embed;
pub mod pathfinder;
pub mod position;
pub mod stop;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use blockpilot_core::command::CommandRegistry;

pub use pathfinder::PathfinderCommand;
pub use position::PositionCommand;
pub use stop::StopCommand;

/// Registry with every built-in command.
pub fn default_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(PathfinderCommand));
    registry.register(Arc::new(PositionCommand));
    registry.register(Arc::new(StopCommand));
    registry
}
