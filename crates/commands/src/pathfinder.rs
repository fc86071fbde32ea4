//! `pathfinder`: walk to a coordinate, bridging over obstacles.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use blockpilot_core::channel::{Interaction, MessageBody, Responder};
use blockpilot_core::command::{Command, CommandContext, CommandOption};
use blockpilot_core::error::CommandError;
use blockpilot_core::navigation::{NavigationObserver, NavigationOutcome, ObstacleReport};
use blockpilot_core::world::{Coordinate, World};

use crate::embed::branded;

pub struct PathfinderCommand;

/// Parse one coordinate option. Surrounding whitespace is tolerated.
pub fn parse_axis(interaction: &Interaction, axis: &str) -> Result<i32, CommandError> {
    let raw = interaction
        .option(axis)
        .ok_or_else(|| CommandError::InvalidArguments(format!("Missing coordinate '{axis}'.")))?;
    raw.trim().parse().map_err(|_| {
        CommandError::InvalidArguments(format!("Coordinate '{axis}' must be an integer, got '{raw}'."))
    })
}

/// The text sent when a goal ends without arriving.
pub fn outcome_text(target: Coordinate, outcome: NavigationOutcome) -> Option<String> {
    match outcome {
        NavigationOutcome::Reached(_) => None,
        NavigationOutcome::Unreachable(attempts) => {
            Some(format!("Failed after {attempts} attempts. Goal unreachable."))
        }
        NavigationOutcome::Cancelled => Some(format!("Pathfinding to {target} was cancelled.")),
    }
}

/// Relays obstacle reports to the invoking user.
struct FollowUpObserver {
    world: Arc<dyn World>,
    responder: Arc<dyn Responder>,
}

#[async_trait]
impl NavigationObserver for FollowUpObserver {
    async fn on_obstacle(&self, report: &ObstacleReport) {
        let embed = branded(self.world.as_ref(), "Pathfinding interrupted by obstacle")
            .field("Obstacle detected at", report.position.to_string());
        if let Err(e) = self.responder.follow_up(embed.into()).await {
            warn!(goal = %report.goal, error = %e, "Failed to deliver obstacle follow-up");
        }
    }
}

#[async_trait]
impl Command for PathfinderCommand {
    fn name(&self) -> &str {
        "pathfinder"
    }

    fn description(&self) -> &str {
        "This command allows the bot to move towards specific coordinates within the Minecraft world."
    }

    fn usage(&self) -> &str {
        "/pathfinder x:<x> y:<y> z:<z>"
    }

    fn options(&self) -> Vec<CommandOption> {
        vec![
            CommandOption::required("x", "The X coordinate."),
            CommandOption::required("y", "The Y coordinate."),
            CommandOption::required("z", "The Z coordinate."),
        ]
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(15)
    }

    async fn execute(
        &self,
        ctx: CommandContext,
        interaction: &Interaction,
        responder: Arc<dyn Responder>,
    ) -> Result<(), CommandError> {
        let target = Coordinate::new(
            parse_axis(interaction, "x")?,
            parse_axis(interaction, "y")?,
            parse_axis(interaction, "z")?,
        );

        let embed = branded(ctx.world.as_ref(), "Pathfinding initiated")
            .field("Current goal", target.to_string());
        responder.reply(embed.into()).await?;
        info!(user = %interaction.user_id, target = %target, "Pathfinding requested");

        let observer = Arc::new(FollowUpObserver {
            world: ctx.world.clone(),
            responder: responder.clone(),
        });
        let run = ctx.navigation.navigate_to(target, observer);

        tokio::spawn(async move {
            let outcome = run.await;

            let body: MessageBody = match outcome {
                NavigationOutcome::Reached(at) => branded(ctx.world.as_ref(), "Pathfinding completed")
                    .field("Current position", at.to_string())
                    .into(),
                other => match outcome_text(target, other) {
                    Some(text) => text.into(),
                    None => return,
                },
            };
            if let Err(e) = responder.follow_up(body).await {
                warn!(target = %target, error = %e, "Failed to deliver pathfinding result");
            }
        });

        Ok(())
    }
}
