//! Command trait: the abstraction over chat-issued commands.
//!
//! Commands are what users invoke from the chat platform: start a navigation
//! goal, stop it, report the agent's position. Each command supplies its own
//! name, usage and description, and is registered in a [`CommandRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::channel::{Interaction, Responder};
use crate::error::CommandError;
use crate::navigation::Navigation;
use crate::world::World;

/// A named option accepted by a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl CommandOption {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// The live session a command runs against.
#[derive(Clone)]
pub struct CommandContext {
    pub world: Arc<dyn World>,
    pub navigation: Arc<dyn Navigation>,
    /// Whether coordinates may be shown to chat users.
    pub show_coordinates: bool,
}

/// The core Command trait.
#[async_trait]
pub trait Command: Send + Sync {
    /// The unique name of this command (e.g., "pathfinder").
    fn name(&self) -> &str;

    /// What this command does.
    fn description(&self) -> &str;

    /// How to invoke it.
    fn usage(&self) -> &str;

    /// Options the chat platform should offer.
    fn options(&self) -> Vec<CommandOption> {
        Vec::new()
    }

    /// Minimum time between two invocations by the same user.
    fn cooldown(&self) -> Duration {
        Duration::ZERO
    }

    /// Run the command. The acknowledgment goes through `responder`; long-running
    /// work may keep the responder and send follow-ups later.
    async fn execute(
        &self,
        ctx: CommandContext,
        interaction: &Interaction,
        responder: Arc<dyn Responder>,
    ) -> std::result::Result<(), CommandError>;
}

/// A registry of available commands, kept in registration order.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name
    /// in its original position.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        match self
            .commands
            .iter()
            .position(|c| c.name() == command.name())
        {
            Some(index) => self.commands[index] = command,
            None => self.commands.push(command),
        }
    }

    /// Get a command by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.iter().find(|c| c.name() == name)
    }

    /// All registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
