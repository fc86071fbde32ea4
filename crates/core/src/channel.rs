//! Channel trait: the abstraction over chat platforms.
//!
//! A Channel connects blockpilot to a messaging platform (Discord, the local
//! console, ...). It delivers slash-style command interactions and carries
//! replies, follow-ups and embeds back to the user who issued them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ChannelError;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A slash-style command invocation received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Unique interaction ID (replies and follow-ups are threaded on it)
    pub id: String,

    /// The channel this interaction arrived on
    pub channel_id: ChannelId,

    /// Sender identifier (platform-specific user ID)
    pub user_id: String,

    /// Human-readable sender name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// The invoked command name
    pub command: String,

    /// Named string options as typed by the user
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,

    pub received_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(channel_id: ChannelId, user_id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id,
            user_id: user_id.into(),
            user_name: None,
            command: command.into(),
            options: BTreeMap::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

/// One name/value row of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// A structured rich response: a title and a list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            footer: None,
            timestamp: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Value of the first field called `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

impl std::fmt::Display for Embed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.title)?;
        for field in &self.fields {
            write!(f, " {}: {}", field.name, field.value)?;
        }
        Ok(())
    }
}

/// The body of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    Embed(Embed),
}

impl MessageBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Embed(_) => None,
        }
    }

    pub fn as_embed(&self) -> Option<&Embed> {
        match self {
            Self::Embed(embed) => Some(embed),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for MessageBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Embed(embed) => embed.fmt(f),
        }
    }
}

impl From<String> for MessageBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Embed> for MessageBody {
    fn from(embed: Embed) -> Self {
        Self::Embed(embed)
    }
}

/// Whether a response is the interaction's acknowledgment or a later message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Initial,
    FollowUp,
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic, command
/// registration, message formatting and authentication.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "discord", "console").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming interactions.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<Interaction, ChannelError>>,
        ChannelError,
    >;

    /// Deliver a reply or follow-up for `interaction`.
    async fn respond(
        &self,
        interaction: &Interaction,
        kind: ReplyKind,
        body: MessageBody,
    ) -> std::result::Result<(), ChannelError>;

    /// Check if a sender is allowed (allowlist check).
    fn is_allowed(&self, user_id: &str) -> bool;

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check: is the channel connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

/// The response channel of one interaction.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Acknowledge the interaction.
    async fn reply(&self, body: MessageBody) -> std::result::Result<(), ChannelError>;

    /// Send a further message after the acknowledgment.
    async fn follow_up(&self, body: MessageBody) -> std::result::Result<(), ChannelError>;
}

/// A [`Responder`] bound to a channel and the interaction it answers.
pub struct InteractionResponder {
    channel: Arc<dyn Channel>,
    interaction: Interaction,
}

impl InteractionResponder {
    pub fn new(channel: Arc<dyn Channel>, interaction: Interaction) -> Self {
        Self {
            channel,
            interaction,
        }
    }
}

#[async_trait]
impl Responder for InteractionResponder {
    async fn reply(&self, body: MessageBody) -> std::result::Result<(), ChannelError> {
        self.channel
            .respond(&self.interaction, ReplyKind::Initial, body)
            .await
    }

    async fn follow_up(&self, body: MessageBody) -> std::result::Result<(), ChannelError> {
        self.channel
            .respond(&self.interaction, ReplyKind::FollowUp, body)
            .await
    }
}
