//! Discord channel adapter (stub).
//!
//! Implements the Channel trait for Discord slash commands.
//! In production, this would use `serenity` for the WebSocket gateway and
//! interaction webhooks. Currently a stub with in-process interaction
//! injection; the most recent outbound replies are kept for inspection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info};

use blockpilot_core::channel::{Channel, ChannelId, Interaction, MessageBody, ReplyKind};
use blockpilot_core::command::CommandOption;
use blockpilot_core::error::ChannelError;

/// Replies kept by [`DiscordChannel::sent`]; older ones are dropped.
pub const OUTBOUND_HISTORY: usize = 256;

/// Discord channel configuration.
#[derive(Clone, Default)]
pub struct DiscordConfig {
    /// Bot token from Discord Developer Portal.
    pub bot_token: String,
    /// Allowed user IDs. Empty = deny all, ["*"] = allow all.
    pub allowed_users: Vec<String>,
    /// Guild (server) IDs to listen in. Empty = all guilds.
    pub guild_filter: Vec<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .field("allowed_users", &self.allowed_users)
            .field("guild_filter", &self.guild_filter)
            .finish()
    }
}

impl From<&blockpilot_config::DiscordConfig> for DiscordConfig {
    fn from(settings: &blockpilot_config::DiscordConfig) -> Self {
        Self {
            bot_token: settings.bot_token.clone().unwrap_or_default(),
            allowed_users: settings.allowed_users.clone(),
            guild_filter: settings.guild_filter.clone(),
        }
    }
}

/// A slash command as announced to Discord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

/// A response the bot sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub interaction_id: String,
    pub user_id: String,
    pub kind: ReplyKind,
    pub body: MessageBody,
}

/// Discord channel adapter.
pub struct DiscordChannel {
    config: DiscordConfig,
    channel_id: ChannelId,
    inject_tx: tokio::sync::Mutex<Option<mpsc::Sender<Result<Interaction, ChannelError>>>>,
    commands: Mutex<Vec<SlashCommand>>,
    outbound: Mutex<VecDeque<OutboundMessage>>,
    delivered: Notify,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            channel_id: ChannelId("discord".into()),
            inject_tx: tokio::sync::Mutex::new(None),
            commands: Mutex::new(Vec::new()),
            outbound: Mutex::new(VecDeque::with_capacity(OUTBOUND_HISTORY)),
            delivered: Notify::new(),
        }
    }

    /// Announce the application's slash commands, replacing earlier ones.
    pub fn register_commands(&self, commands: Vec<SlashCommand>) {
        info!(count = commands.len(), "Registering Discord slash commands (stub)");
        *self.commands.lock().unwrap_or_else(PoisonError::into_inner) = commands;
    }

    /// Slash commands currently announced.
    pub fn registered_commands(&self) -> Vec<SlashCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether interactions from `guild_id` are listened to.
    pub fn accepts_guild(&self, guild_id: &str) -> bool {
        self.config.guild_filter.is_empty() || self.config.guild_filter.iter().any(|g| g == guild_id)
    }

    /// Inject an interaction as if it came from Discord (for testing).
    pub async fn inject_interaction(&self, interaction: Interaction) -> Result<(), ChannelError> {
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(Ok(interaction))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Interaction channel closed".into()))
        } else {
            Err(ChannelError::ConnectionLost("Channel not started".into()))
        }
    }

    /// Inject an interaction raised in `guild_id`. Returns `false` when the
    /// guild filter drops it.
    pub async fn inject_in_guild(
        &self,
        guild_id: &str,
        interaction: Interaction,
    ) -> Result<bool, ChannelError> {
        if !self.accepts_guild(guild_id) {
            debug!(guild = %guild_id, command = %interaction.command, "Interaction from filtered guild dropped");
            return Ok(false);
        }
        self.inject_interaction(interaction).await?;
        Ok(true)
    }

    /// The last [`OUTBOUND_HISTORY`] responses sent, oldest first.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Responses sent for one interaction, in order.
    pub fn sent_for(&self, interaction_id: &str) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.interaction_id == interaction_id)
            .collect()
    }

    /// Wait until at least `count` responses were sent for `interaction_id`.
    pub async fn wait_for_responses(&self, interaction_id: &str, count: usize) -> Vec<OutboundMessage> {
        loop {
            let notified = self.delivered.notified();
            let sent = self.sent_for(interaction_id);
            if sent.len() >= count {
                return sent;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<Interaction, ChannelError>>, ChannelError> {
        info!("Discord channel starting (stub mode)");
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn respond(
        &self,
        interaction: &Interaction,
        kind: ReplyKind,
        body: MessageBody,
    ) -> Result<(), ChannelError> {
        info!(
            interaction = %interaction.id,
            user = %interaction.user_id,
            kind = ?kind,
            body = %body,
            "Discord respond (stub)"
        );
        {
            let mut outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
            if outbound.len() == OUTBOUND_HISTORY {
                outbound.pop_front();
            }
            outbound.push_back(OutboundMessage {
                interaction_id: interaction.id.clone(),
                user_id: interaction.user_id.clone(),
                kind,
                body,
            });
        }
        self.delivered.notify_waiters();
        Ok(())
    }

    fn is_allowed(&self, user_id: &str) -> bool {
        if self.config.allowed_users.is_empty() {
            return false;
        }
        if self.config.allowed_users.iter().any(|u| u == "*") {
            return true;
        }
        self.config.allowed_users.iter().any(|u| u == user_id)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Discord channel stopping");
        *self.inject_tx.lock().await = None;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(!self.config.bot_token.is_empty())
    }
}
