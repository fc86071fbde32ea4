//! `stop`: abandon the active goal.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use blockpilot_core::channel::{Interaction, Responder};
use blockpilot_core::command::{Command, CommandContext};
use blockpilot_core::error::CommandError;

pub struct StopCommand;

#[async_trait]
impl Command for StopCommand {
    fn name(&self) -> &str {
        "stop"
    }

    fn description(&self) -> &str {
        "Stops the bot's current movement goal."
    }

    fn usage(&self) -> &str {
        "/stop"
    }

    async fn execute(
        &self,
        ctx: CommandContext,
        interaction: &Interaction,
        responder: Arc<dyn Responder>,
    ) -> Result<(), CommandError> {
        let cancelled = ctx.navigation.cancel();
        ctx.world.set_goal(None);

        let text = match cancelled {
            Some(goal) => {
                info!(user = %interaction.user_id, goal = %goal.id, "Navigation stopped");
                format!("Stopped pathfinding to {}.", goal.target)
            }
            None => "There is no active goal to stop.".to_string(),
        };
        responder.reply(text.into()).await?;
        Ok(())
    }
}
