//! The summarization core of chatdigest.
//!
//! - [`MessageCache`]: bounded per-channel window of recent messages
//! - [`truncate`]: keeps the newest messages that fit a character budget
//! - [`SummarizationClient`]: turns a conversation into a prompt and asks the
//!   inference provider for a summary

pub mod cache;
pub mod client;
pub mod error;
pub mod truncate;

pub use cache::MessageCache;
pub use client::{
    build_prompt, format_conversation, SummarizationClient, NOTHING_TO_SUMMARIZE,
    SYSTEM_INSTRUCTION,
};
pub use error::SummarizeError;
pub use truncate::{serialized_len, truncate};
