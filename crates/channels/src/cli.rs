//! CLI channel — interactive terminal-based chat.
//!
//! Reads lines from stdin as messages from a local user in a single chat and
//! prints replies to stdout. Lets the bot run against a local model without a
//! chat platform.

use async_trait::async_trait;
use chatdigest_core::channel::{Channel, ChannelId, ChannelMessage};
use chatdigest_core::error::ChannelError;
use chrono::Utc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Chat id used for the single terminal conversation.
pub const CLI_CHAT_ID: &str = "cli";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    user_name: String,
}

impl CliChannel {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            id: ChannelId("cli".into()),
            user_name: user_name.into(),
        }
    }

    fn message(channel_id: &ChannelId, user_name: &str, content: String) -> ChannelMessage {
        ChannelMessage {
            channel_id: channel_id.clone(),
            chat_id: CLI_CHAT_ID.into(),
            chat_name: Some("terminal".into()),
            sender_id: "local_user".into(),
            sender_name: Some(user_name.to_string()),
            content,
            is_bot: false,
            timestamp: Utc::now(),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new("You")
    }
}

fn is_exit_command(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q")
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let user_name = self.user_name.clone();

        tokio::spawn(async move {
            let reader = BufReader::new(io::stdin());
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        if is_exit_command(&line) {
                            break;
                        }

                        let msg = Self::message(&channel_id, &user_name, line);
                        if tx.send(Ok(msg)).await.is_err() {
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

    async fn send(&self, _chat_id: &str, content: &str) -> Result<(), ChannelError> {
        println!("{content}\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_channel_properties() {
        let ch = CliChannel::default();
        assert_eq!(ch.name(), "cli");
        assert_eq!(ch.id().0, "cli");
    }

    #[test]
    fn builds_local_user_messages() {
        let ch = CliChannel::new("dana");
        let msg = CliChannel::message(ch.id(), "dana", "!sumcache".into());
        assert_eq!(msg.chat_id, CLI_CHAT_ID);
        assert_eq!(msg.author(), "dana");
        assert!(!msg.is_bot);
    }

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command(":q"));
        assert!(!is_exit_command("!summarize"));
    }

    #[tokio::test]
    async fn history_falls_back_to_default() {
        let ch = CliChannel::default();
        assert!(ch.history(CLI_CHAT_ID, 5).await.is_err());
    }
}
