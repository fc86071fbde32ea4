//! `position`: report where the agent stands.

use async_trait::async_trait;
use std::sync::Arc;

use blockpilot_core::channel::{Interaction, Responder};
use blockpilot_core::command::{Command, CommandContext};
use blockpilot_core::error::CommandError;

use crate::embed::branded;

pub struct PositionCommand;

#[async_trait]
impl Command for PositionCommand {
    fn name(&self) -> &str {
        "position"
    }

    fn description(&self) -> &str {
        "Shows the bot's current coordinates."
    }

    fn usage(&self) -> &str {
        "/position"
    }

    async fn execute(
        &self,
        ctx: CommandContext,
        _interaction: &Interaction,
        responder: Arc<dyn Responder>,
    ) -> Result<(), CommandError> {
        if !ctx.show_coordinates {
            responder
                .reply("Coordinate display is disabled.".into())
                .await?;
            return Ok(());
        }

        let at = ctx.world.position().rounded();
        let embed = branded(ctx.world.as_ref(), "Current position")
            .field("Position", at.to_string());
        responder.reply(embed.into()).await?;
        Ok(())
    }
}
