//! Command dispatcher: routes chat-platform interactions to commands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use blockpilot_channels::{ChannelRegistry, SlashCommand};
use blockpilot_core::channel::{Interaction, InteractionResponder, Responder};
use blockpilot_core::command::{CommandOption, CommandRegistry};
use blockpilot_core::error::{ChannelError, CommandError};

use crate::help::help_text;
use crate::session::SessionSlot;
use crate::shutdown_requested;

/// Name of the built-in help command.
pub const HELP_COMMAND: &str = "help";

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    session: SessionSlot,
    show_coordinates: bool,
    /// When each (user, command) pair may run again. Expired entries are pruned.
    ready_at: Mutex<HashMap<(String, String), Instant>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, session: SessionSlot, show_coordinates: bool) -> Self {
        Self {
            registry,
            session,
            show_coordinates,
            ready_at: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Slash command definitions for platforms that need them announced.
    pub fn slash_commands(&self) -> Vec<SlashCommand> {
        let mut commands: Vec<SlashCommand> = self
            .registry
            .iter()
            .map(|c| SlashCommand {
                name: c.name().to_string(),
                description: c.description().to_string(),
                options: c.options(),
            })
            .collect();
        commands.push(SlashCommand {
            name: HELP_COMMAND.into(),
            description: "Lists commands, or describes one.".into(),
            options: vec![CommandOption {
                name: "command".into(),
                description: "The command to describe.".into(),
                required: false,
            }],
        });
        commands
    }

    /// Run one interaction.
    ///
    /// Errors are returned without answering; [`Dispatcher::handle`] turns
    /// them into replies.
    pub async fn dispatch(
        &self,
        interaction: &Interaction,
        responder: Arc<dyn Responder>,
    ) -> Result<(), CommandError> {
        if interaction.command == HELP_COMMAND {
            let text = help_text(&self.registry, interaction.option("command"));
            responder.reply(text.into()).await?;
            return Ok(());
        }

        let command = self
            .registry
            .get(&interaction.command)
            .ok_or_else(|| CommandError::NotFound(interaction.command.clone()))?;

        let session = self.session.current().await.ok_or(CommandError::NotConnected)?;
        self.check_cooldown(interaction, command.name(), command.cooldown())?;

        debug!(command = %command.name(), user = %interaction.user_id, "Executing command");
        command
            .execute(session.context(self.show_coordinates), interaction, responder)
            .await
    }

    /// Stamp a use of `name`, or refuse it while the cooldown runs.
    fn check_cooldown(
        &self,
        interaction: &Interaction,
        name: &str,
        cooldown: std::time::Duration,
    ) -> Result<(), CommandError> {
        if cooldown.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let key = (interaction.user_id.clone(), name.to_string());
        let mut ready_at = self.ready_at.lock().unwrap_or_else(PoisonError::into_inner);
        ready_at.retain(|_, at| *at > now);
        if let Some(at) = ready_at.get(&key) {
            let remaining = *at - now;
            let remaining_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(CommandError::CooldownActive {
                command: name.to_string(),
                remaining_secs,
            });
        }
        ready_at.insert(key, now + cooldown);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_cooldowns(&self) -> usize {
        self.ready_at.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run one interaction and answer any error that the user should see.
    pub async fn handle(&self, interaction: &Interaction, responder: Arc<dyn Responder>) {
        let Err(error) = self.dispatch(interaction, responder.clone()).await else {
            return;
        };

        let text = match &error {
            CommandError::NotFound(name) => {
                debug!(command = %name, "Ignoring unknown command");
                return;
            }
            CommandError::CooldownActive {
                command,
                remaining_secs,
            } => format!(
                "Please wait {remaining_secs} more second(s) before reusing the `{command}` command."
            ),
            CommandError::InvalidArguments(reason) => reason.clone(),
            CommandError::NotConnected => "The bot is not connected to the game server.".into(),
            CommandError::ExecutionFailed { .. } => error.to_string(),
            CommandError::Channel(e) => {
                warn!(command = %interaction.command, error = %e, "Reply could not be delivered");
                return;
            }
        };
        info!(command = %interaction.command, user = %interaction.user_id, error = %error, "Command refused");
        if let Err(e) = responder.reply(text.into()).await {
            warn!(command = %interaction.command, error = %e, "Error reply could not be delivered");
        }
    }

    /// Serve every channel until `shutdown` turns true or all channels close.
    pub async fn serve(
        &self,
        channels: &ChannelRegistry,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ChannelError> {
        let mut inbound = channels.start_all().await?;
        info!(channels = ?channels.list(), "Dispatcher serving");

        loop {
            let (name, item) = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                next = inbound.recv() => match next {
                    Some(next) => next,
                    None => break,
                },
            };

            let interaction = match item {
                Ok(interaction) => interaction,
                Err(e) => {
                    warn!(channel = %name, error = %e, "Channel delivered an error");
                    continue;
                }
            };
            let Some(channel) = channels.get(&name) else {
                continue;
            };
            if !channel.is_allowed(&interaction.user_id) {
                let denied = ChannelError::Unauthorized {
                    channel: name.clone(),
                    sender_id: interaction.user_id.clone(),
                };
                warn!(command = %interaction.command, error = %denied, "Interaction rejected");
                continue;
            }

            let responder = Arc::new(InteractionResponder::new(channel.clone(), interaction.clone()));
            self.handle(&interaction, responder).await;
        }

        channels.stop_all().await;
        info!("Dispatcher stopped");
        Ok(())
    }
}
