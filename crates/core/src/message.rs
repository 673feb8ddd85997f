//! Message domain types.
//!
//! Two kinds of message flow through the system:
//! a [`ChatMessage`] is a line observed in a chat channel and kept in the cache,
//! a [`Message`] is a role-tagged prompt entry sent to the inference service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The request content
    User,
    /// Model output
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single role-tagged message in an inference request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A message observed in a chat channel.
///
/// Immutable once created; the cache and any snapshot hold their own clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the author
    pub author: String,

    /// Raw text content
    pub content: String,

    /// When the platform received the message
    pub timestamp: DateTime<Utc>,

    /// Whether the author is a bot or service account
    #[serde(default)]
    pub is_bot: bool,
}

impl ChatMessage {
    /// A message from a human author, timestamped now.
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            timestamp: Utc::now(),
            is_bot: false,
        }
    }

    pub fn from_bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    /// Human-authored with non-blank content.
    pub fn is_qualifying(&self) -> bool {
        !self.is_bot && !self.content.trim().is_empty()
    }

    /// Rendered as `"{author}: {content}\n"`, the unit of the character budget.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}\n", self.author, self.content)
    }
}
