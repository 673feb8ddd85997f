//! Domain event system — decoupled notifications about bot activity.
//!
//! Events are published when something interesting happens in the system.
//! Other components can subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Where a summarized conversation was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Platform channel history
    History,
    /// The bot's own message cache
    Cache,
}

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A qualifying message entered the cache
    MessageCached {
        chat_id: String,
        cached: usize,
        timestamp: DateTime<Utc>,
    },

    /// A user asked for a summary
    SummaryRequested {
        chat_id: String,
        source: SummarySource,
        requested_by: String,
        timestamp: DateTime<Utc>,
    },

    /// A summary was produced and handed to the channel
    SummaryCompleted {
        chat_id: String,
        message_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Summarization failed
    SummaryFailed {
        chat_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
