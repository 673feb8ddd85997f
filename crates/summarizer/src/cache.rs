//! Per-channel bounded message cache.
//!
//! Keeps the most recent qualifying messages of every channel the bot has
//! seen, oldest first. Process-lifetime state: nothing is persisted and
//! channels are never evicted.

use std::collections::{HashMap, VecDeque};

use chatdigest_config::SummaryConfig;
use chatdigest_core::message::ChatMessage;
use tokio::sync::RwLock;
use tracing::trace;

/// FIFO ring of recent messages per channel.
///
/// The write lock spans a whole append+evict, so a concurrent `snapshot`
/// sees either the state before or after a `record`, never in between.
pub struct MessageCache {
    capacity: usize,
    channels: RwLock<HashMap<String, VecDeque<ChatMessage>>>,
}

impl MessageCache {
    /// A cache holding at most `capacity` messages per channel (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &SummaryConfig) -> Self {
        Self::new(config.max_cached_messages)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a message to a channel's window.
    ///
    /// Bot-authored and blank messages are ignored; returns whether the
    /// message was stored.
    pub async fn record(&self, channel_id: &str, message: ChatMessage) -> bool {
        if !message.is_qualifying() {
            trace!(channel_id, "Skipping non-qualifying message");
            return false;
        }

        let mut channels = self.channels.write().await;
        let window = channels
            .entry(channel_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));

        window.push_back(message);
        while window.len() > self.capacity {
            window.pop_front();
        }
        true
    }

    /// Copy of a channel's window, oldest first. Empty for unseen channels.
    pub async fn snapshot(&self, channel_id: &str) -> Vec<ChatMessage> {
        self.channels
            .read()
            .await
            .get(channel_id)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The last `n` cached messages of a channel, oldest first.
    pub async fn recent(&self, channel_id: &str, n: usize) -> Vec<ChatMessage> {
        let channels = self.channels.read().await;
        match channels.get(channel_id) {
            Some(window) => {
                let skip = window.len().saturating_sub(n);
                window.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Number of messages cached for a channel.
    pub async fn len(&self, channel_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel_id)
            .map_or(0, VecDeque::len)
    }
}
