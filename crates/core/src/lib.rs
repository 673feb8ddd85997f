//! # chatdigest core
//!
//! Domain types, traits, and error definitions for the chatdigest bot.
//! This crate has no framework dependencies; it defines the domain model
//! that the other crates implement against.
//!
//! Every external collaborator (inference backend, chat platform) is a trait
//! here. Implementations live in their respective crates, so tests can swap
//! in mocks.

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{ChannelError, ProviderError};
pub use message::{ChatMessage, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use channel::{Channel, ChannelId, ChannelMessage};
pub use event::{DomainEvent, EventBus, SummarySource};
