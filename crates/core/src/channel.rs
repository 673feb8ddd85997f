//! Channel trait — the abstraction over chat platforms.
//!
//! A Channel connects chatdigest to a messaging platform (Discord, the local
//! terminal). It delivers observed messages and sends replies back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;
use crate::message::ChatMessage;

/// Unique identifier for a channel adapter instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The adapter this message came through
    pub channel_id: ChannelId,

    /// The conversation stream within the platform (Discord channel, CLI session)
    pub chat_id: String,

    /// Human-readable name of the conversation stream (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_name: Option<String>,

    /// Sender identifier (platform-specific user ID)
    pub sender_id: String,

    /// Display name of the sender (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// The text content
    pub content: String,

    /// Whether the sender is a bot account
    #[serde(default)]
    pub is_bot: bool,

    /// When the platform received the message
    pub timestamp: DateTime<Utc>,
}

impl ChannelMessage {
    /// Display name used as the author in transcripts.
    pub fn author(&self) -> &str {
        self.sender_name.as_deref().unwrap_or(&self.sender_id)
    }

    /// Conversation name for replies, falling back to the raw id.
    pub fn chat_label(&self) -> &str {
        self.chat_name.as_deref().unwrap_or(&self.chat_id)
    }

    /// The cacheable view of this message.
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            author: self.author().to_string(),
            content: self.content.clone(),
            timestamp: self.timestamp,
            is_bot: self.is_bot,
        }
    }
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic and message
/// formatting.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "discord", "cli").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming messages.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Send a message to a specific chat.
    async fn send(&self, chat_id: &str, content: &str) -> std::result::Result<(), ChannelError>;

    /// Fetch up to `limit` of the most recent messages of a chat, oldest first.
    ///
    /// Adapters without access to platform history keep the default.
    async fn history(
        &self,
        _chat_id: &str,
        _limit: usize,
    ) -> std::result::Result<Vec<ChannelMessage>, ChannelError> {
        Err(ChannelError::Unsupported {
            channel: self.name().to_string(),
            operation: "history".into(),
        })
    }

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check — is the channel connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender_name: Option<&str>) -> ChannelMessage {
        ChannelMessage {
            channel_id: ChannelId("discord".into()),
            chat_id: "1234".into(),
            chat_name: None,
            sender_id: "42".into(),
            sender_name: sender_name.map(String::from),
            content: "Hello bot!".into(),
            is_bot: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn author_prefers_display_name() {
        assert_eq!(message(Some("Alice")).author(), "Alice");
        assert_eq!(message(None).author(), "42");
    }

    #[test]
    fn converts_to_chat_message() {
        let msg = message(Some("Alice"));
        let chat = msg.to_chat_message();
        assert_eq!(chat.author, "Alice");
        assert_eq!(chat.content, "Hello bot!");
        assert_eq!(chat.timestamp, msg.timestamp);
        assert!(!chat.is_bot);
    }

    #[test]
    fn chat_label_falls_back_to_id() {
        let mut msg = message(None);
        assert_eq!(msg.chat_label(), "1234");
        msg.chat_name = Some("general".into());
        assert_eq!(msg.chat_label(), "general");
    }
}
