//! Console channel: slash commands typed in the terminal.
//!
//! Reads `/command name:value ...` lines from stdin and prints responses to
//! stdout. Used for `blockpilot run --console`.

use async_trait::async_trait;
use blockpilot_core::channel::{Channel, ChannelId, Interaction, MessageBody, ReplyKind};
use blockpilot_core::error::ChannelError;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

const CONSOLE_USER: &str = "local_user";

/// Interactive console channel.
pub struct ConsoleChannel {
    id: ChannelId,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("console".into()),
        }
    }

    /// Parse one typed line into an interaction.
    ///
    /// The leading slash is optional; every argument must be `name:value`.
    pub fn parse_line(&self, line: &str) -> Result<Interaction, ChannelError> {
        let mut words = line.split_whitespace();
        let command = words
            .next()
            .map(|w| w.trim_start_matches('/'))
            .filter(|w| !w.is_empty())
            .ok_or_else(|| ChannelError::InvalidPayload("empty command".into()))?;

        let mut interaction = Interaction::new(self.id.clone(), CONSOLE_USER, command);
        interaction.user_name = Some("console".into());
        for word in words {
            let (name, value) = word.split_once(':').ok_or_else(|| {
                ChannelError::InvalidPayload(format!("expected name:value, got '{word}'"))
            })?;
            if name.is_empty() {
                return Err(ChannelError::InvalidPayload(format!("missing option name in '{word}'")));
            }
            interaction = interaction.with_option(name, value);
        }
        Ok(interaction)
    }

    /// How a response is printed.
    pub fn format_response(kind: ReplyKind, body: &MessageBody) -> String {
        let marker = match kind {
            ReplyKind::Initial => ">",
            ReplyKind::FollowUp => "  >>",
        };
        format!("{marker} {body}")
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<Interaction, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let parser = ConsoleChannel::new();

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        // Check for exit commands
                        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let parsed = parser.parse_line(line);
                        if let Err(e) = &parsed {
                            warn!(error = %e, "Unparseable console input");
                        }
                        if tx.send(parsed).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn respond(
        &self,
        _interaction: &Interaction,
        kind: ReplyKind,
        body: MessageBody,
    ) -> Result<(), ChannelError> {
        println!("{}", Self::format_response(kind, &body));
        Ok(())
    }

    fn is_allowed(&self, _user_id: &str) -> bool {
        true // Console is always allowed (local user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockpilot_core::channel::Embed;

    #[test]
    fn console_channel_properties() {
        let ch = ConsoleChannel::new();
        assert_eq!(ch.name(), "console");
        assert_eq!(ch.id().0, "console");
        assert!(ch.is_allowed("anyone"));
    }

    #[test]
    fn parses_slash_command_with_options() {
        let ch = ConsoleChannel::new();
        let interaction = ch.parse_line("/pathfinder x:10 y:64 z:-3").unwrap();
        assert_eq!(interaction.command, "pathfinder");
        assert_eq!(interaction.option("x"), Some("10"));
        assert_eq!(interaction.option("z"), Some("-3"));
        assert_eq!(interaction.user_id, CONSOLE_USER);
    }

    #[test]
    fn slash_is_optional() {
        let ch = ConsoleChannel::new();
        let interaction = ch.parse_line("help command:stop").unwrap();
        assert_eq!(interaction.command, "help");
        assert_eq!(interaction.option("command"), Some("stop"));
    }

    #[test]
    fn rejects_bare_arguments() {
        let ch = ConsoleChannel::new();
        assert!(matches!(
            ch.parse_line("/pathfinder 1 2 3"),
            Err(ChannelError::InvalidPayload(_))
        ));
        assert!(ch.parse_line("/").is_err());
        assert!(ch.parse_line("/help :x").is_err());
    }

    #[test]
    fn response_formatting() {
        let embed = Embed::new("Pathfinding completed").field("Current position", "1, 2, 3");
        assert_eq!(
            ConsoleChannel::format_response(ReplyKind::Initial, &embed.into()),
            "> [Pathfinding completed] Current position: 1, 2, 3"
        );
        assert_eq!(
            ConsoleChannel::format_response(ReplyKind::FollowUp, &"done".into()),
            "  >> done"
        );
    }
}
