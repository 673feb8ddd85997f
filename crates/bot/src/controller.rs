//! Bot controller — turns chat events into cache updates and replies.
//!
//! Events are handled one at a time on the caller's task. Every summary runs
//! on its own spawned task, so a slow inference call never holds up message
//! ingestion; the reply is sent from that task when the call finishes.
//! Summary tasks are tracked in a [`JoinSet`], and [`BotController::run`]
//! waits for them once the event stream closes.

use std::sync::Arc;

use chatdigest_config::AppConfig;
use chatdigest_core::channel::{Channel, ChannelMessage};
use chatdigest_core::error::ChannelError;
use chatdigest_core::event::{DomainEvent, EventBus, SummarySource};
use chatdigest_core::message::ChatMessage;
use chatdigest_summarizer::{truncate, MessageCache, SummarizationClient};
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::command::{self, Command};
use crate::reply::{self, SummaryInfo};

/// Wires a channel to the cache and the summarizer.
pub struct BotController {
    cache: Arc<MessageCache>,
    summarizer: Arc<SummarizationClient>,
    channel: Arc<dyn Channel>,
    events: Arc<EventBus>,
    prefix: String,
    max_chars: usize,
    default_history_limit: usize,
    summaries: Mutex<JoinSet<()>>,
}

impl BotController {
    pub fn new(
        cache: Arc<MessageCache>,
        summarizer: Arc<SummarizationClient>,
        channel: Arc<dyn Channel>,
        config: &AppConfig,
    ) -> Self {
        Self {
            cache,
            summarizer,
            channel,
            events: Arc::new(EventBus::default()),
            prefix: config.discord.prefix.clone(),
            max_chars: config.summary.max_conversation_chars,
            default_history_limit: config.summary.default_history_limit,
            summaries: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn cache(&self) -> &Arc<MessageCache> {
        &self.cache
    }

    /// Process channel events until the stream closes, then wait for every
    /// summary still in flight.
    pub async fn run(&self, mut incoming: mpsc::Receiver<Result<ChannelMessage, ChannelError>>) {
        while let Some(event) = incoming.recv().await {
            match event {
                Ok(message) => {
                    self.handle(message).await;
                }
                Err(e) => warn!(channel = %self.channel.name(), error = %e, "Channel error"),
            }
        }
        info!(channel = %self.channel.name(), "Channel stream closed");
        self.wait_for_summaries().await;
    }

    /// Handle one observed message.
    ///
    /// Returns whether the message started a summary task.
    pub async fn handle(&self, message: ChannelMessage) -> bool {
        if message.is_bot {
            return false;
        }

        if self.cache.record(&message.chat_id, message.to_chat_message()).await {
            self.events.publish(DomainEvent::MessageCached {
                chat_id: message.chat_id.clone(),
                cached: self.cache.len(&message.chat_id).await,
                timestamp: Utc::now(),
            });
        }

        let command = match command::parse(&self.prefix, &message.content) {
            Ok(Some(command)) => command,
            Ok(None) => return false,
            Err(e) => {
                debug!(error = %e, "Rejected command argument");
                self.reply(&message.chat_id, &reply::invalid_count(&self.prefix)).await;
                return false;
            }
        };

        match command {
            Command::Help => {
                let help = reply::help(&self.prefix, self.summarizer.model()).render();
                self.reply(&message.chat_id, &help).await;
                false
            }
            Command::Summarize { limit } => {
                let limit = limit.unwrap_or(self.default_history_limit);
                self.spawn_summary(&message, Scope::History(limit)).await;
                true
            }
            Command::SummarizeCache => {
                if self.cache.len(&message.chat_id).await == 0 {
                    self.reply(&message.chat_id, &reply::no_cached_messages(&self.prefix))
                        .await;
                    return false;
                }
                self.spawn_summary(&message, Scope::Cache).await;
                true
            }
        }
    }

    /// Wait until every started summary has replied or failed.
    pub async fn wait_for_summaries(&self) {
        let mut summaries = self.summaries.lock().await;
        while let Some(result) = summaries.join_next().await {
            log_join_error(result);
        }
    }

    /// Cancel every summary still in flight.
    pub async fn abort_summaries(&self) {
        let mut summaries = self.summaries.lock().await;
        if !summaries.is_empty() {
            info!(pending = summaries.len(), "Cancelling summaries in flight");
        }
        summaries.shutdown().await;
    }

    /// Acknowledge the request, then summarize on a background task.
    async fn spawn_summary(&self, message: &ChannelMessage, scope: Scope) {
        let job = SummaryJob {
            cache: self.cache.clone(),
            summarizer: self.summarizer.clone(),
            channel: self.channel.clone(),
            events: self.events.clone(),
            chat_id: message.chat_id.clone(),
            chat_label: message.chat_label().to_string(),
            requested_by: message.author().to_string(),
            prefix: self.prefix.clone(),
            max_chars: self.max_chars,
            scope,
        };

        self.events.publish(DomainEvent::SummaryRequested {
            chat_id: job.chat_id.clone(),
            source: scope.source(),
            requested_by: job.requested_by.clone(),
            timestamp: Utc::now(),
        });

        let progress = match scope {
            Scope::History(_) => reply::PROGRESS_HISTORY,
            Scope::Cache => reply::PROGRESS_CACHE,
        };
        self.reply(&message.chat_id, progress).await;

        let mut summaries = self.summaries.lock().await;
        while let Some(result) = summaries.try_join_next() {
            log_join_error(result);
        }
        summaries.spawn(job.run());
    }

    async fn reply(&self, chat_id: &str, content: &str) {
        send_logged(self.channel.as_ref(), chat_id, content).await;
    }
}

/// What a summary covers.
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// The last `n` messages of channel history
    History(usize),
    /// Everything in the cache
    Cache,
}

impl Scope {
    fn source(self) -> SummarySource {
        match self {
            Scope::History(_) => SummarySource::History,
            Scope::Cache => SummarySource::Cache,
        }
    }
}

/// A summary request detached from the event loop.
struct SummaryJob {
    cache: Arc<MessageCache>,
    summarizer: Arc<SummarizationClient>,
    channel: Arc<dyn Channel>,
    events: Arc<EventBus>,
    chat_id: String,
    chat_label: String,
    requested_by: String,
    prefix: String,
    max_chars: usize,
    scope: Scope,
}

impl SummaryJob {
    async fn run(self) {
        let messages = self.collect().await;
        if messages.is_empty() {
            let notice = match self.scope {
                Scope::History(_) => reply::NO_MESSAGES.to_string(),
                Scope::Cache => reply::no_cached_messages(&self.prefix),
            };
            self.send(&notice).await;
            return;
        }

        let conversation = truncate(&messages, self.max_chars);
        debug!(
            chat_id = %self.chat_id,
            collected = messages.len(),
            kept = conversation.len(),
            "Conversation truncated"
        );

        match self.summarizer.summarize(&conversation).await {
            Ok(summary) => {
                let info = SummaryInfo {
                    message_count: conversation.len(),
                    channel: &self.chat_label,
                    requested_by: &self.requested_by,
                    model: self.summarizer.model(),
                };
                let rendered = match self.scope {
                    Scope::History(_) => reply::history_summary(&summary, &info),
                    Scope::Cache => reply::cache_summary(&summary, &info),
                }
                .render();
                self.send(&rendered).await;

                info!(chat_id = %self.chat_id, messages = conversation.len(), "Summary delivered");
                self.events.publish(DomainEvent::SummaryCompleted {
                    chat_id: self.chat_id.clone(),
                    message_count: conversation.len(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                error!(chat_id = %self.chat_id, error = %e, "Summarization failed");
                let notice = match self.scope {
                    Scope::History(_) => reply::FAILED_HISTORY,
                    Scope::Cache => reply::FAILED_CACHE,
                };
                self.send(notice).await;
                self.events.publish(DomainEvent::SummaryFailed {
                    chat_id: self.chat_id.clone(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Messages to summarize, oldest first.
    ///
    /// History falls back to the cache when the adapter cannot serve it.
    async fn collect(&self) -> Vec<ChatMessage> {
        let limit = match self.scope {
            Scope::Cache => return self.cache.snapshot(&self.chat_id).await,
            Scope::History(limit) => limit,
        };

        match self.channel.history(&self.chat_id, limit).await {
            Ok(history) => {
                let qualifying: Vec<ChatMessage> = history
                    .iter()
                    .map(ChannelMessage::to_chat_message)
                    .filter(ChatMessage::is_qualifying)
                    .collect();
                let skip = qualifying.len().saturating_sub(limit);
                qualifying.into_iter().skip(skip).collect()
            }
            Err(e) => {
                debug!(chat_id = %self.chat_id, reason = %e, "History unavailable, using cache");
                self.cache.recent(&self.chat_id, limit).await
            }
        }
    }

    async fn send(&self, content: &str) {
        send_logged(self.channel.as_ref(), &self.chat_id, content).await;
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "Summary task panicked");
        }
    }
}

/// Send a reply; delivery failures are logged, never propagated.
async fn send_logged(channel: &dyn Channel, chat_id: &str, content: &str) {
    if let Err(e) = channel.send(chat_id, content).await {
        warn!(
            channel = %channel.name(),
            chat_id = %chat_id,
            error = %e,
            "Failed to send reply"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatdigest_core::channel::ChannelId;
    use chatdigest_core::error::ProviderError;
    use chatdigest_core::message::Message;
    use chatdigest_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use std::time::Duration;

    struct StubProvider {
        reply: Result<String, ProviderError>,
        delay: Option<Duration>,
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn new(reply: Result<String, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                delay: None,
                prompts: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn slow(reply: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                delay: Some(delay),
                prompts: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let prompt = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            self.reply.clone().map(|text| ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model: "stub".into(),
            })
        }
    }

    /// Records replies; optionally serves a fixed history.
    struct StubChannel {
        id: ChannelId,
        sent: std::sync::Mutex<Vec<(String, String)>>,
        history: Option<Vec<ChannelMessage>>,
    }

    impl StubChannel {
        fn new(history: Option<Vec<ChannelMessage>>) -> Arc<Self> {
            Arc::new(Self {
                id: ChannelId("stub".into()),
                sent: std::sync::Mutex::new(Vec::new()),
                history,
            })
        }

        fn replies(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Channel for StubChannel {
        fn name(&self) -> &str {
            "stub"
        }

        fn id(&self) -> &ChannelId {
            &self.id
        }

        async fn start(
            &self,
        ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn send(&self, chat_id: &str, content: &str) -> Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), content.to_string()));
            Ok(())
        }

        async fn history(
            &self,
            chat_id: &str,
            limit: usize,
        ) -> Result<Vec<ChannelMessage>, ChannelError> {
            match &self.history {
                Some(history) => {
                    let skip = history.len().saturating_sub(limit);
                    Ok(history.iter().skip(skip).cloned().collect())
                }
                None => Err(ChannelError::Unsupported {
                    channel: chat_id.to_string(),
                    operation: "history".into(),
                }),
            }
        }
    }

    fn incoming(author: &str, content: &str) -> ChannelMessage {
        ChannelMessage {
            channel_id: ChannelId("stub".into()),
            chat_id: "room".into(),
            chat_name: Some("general".into()),
            sender_id: author.to_lowercase(),
            sender_name: Some(author.into()),
            content: content.into(),
            is_bot: false,
            timestamp: Utc::now(),
        }
    }

    fn controller(provider: Arc<StubProvider>, channel: Arc<StubChannel>) -> BotController {
        let config = AppConfig::default();
        let cache = Arc::new(MessageCache::from_config(&config.summary));
        let summarizer = Arc::new(SummarizationClient::from_config(provider, &config.inference));
        BotController::new(cache, summarizer, channel, &config)
    }

    #[tokio::test]
    async fn plain_chat_is_cached_silently() {
        let channel = StubChannel::new(None);
        let bot = controller(StubProvider::new(Ok("x".into())), channel.clone());

        assert!(!bot.handle(incoming("Alice", "hello")).await);
        assert_eq!(bot.cache().len("room").await, 1);
        assert!(channel.replies().is_empty());
    }

    #[tokio::test]
    async fn bot_messages_are_ignored() {
        let channel = StubChannel::new(None);
        let bot = controller(StubProvider::new(Ok("x".into())), channel.clone());

        let mut message = incoming("Digest", "!help");
        message.is_bot = true;
        assert!(!bot.handle(message).await);
        assert_eq!(bot.cache().len("room").await, 0);
        assert!(channel.replies().is_empty());
    }

    #[tokio::test]
    async fn help_replies_immediately() {
        let channel = StubChannel::new(None);
        let bot = controller(StubProvider::new(Ok("x".into())), channel.clone());

        assert!(!bot.handle(incoming("Alice", "!help")).await);
        let replies = channel.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("Conversation Summarizer Bot"));
    }

    #[tokio::test]
    async fn bad_count_gets_usage_hint() {
        let channel = StubChannel::new(None);
        let bot = controller(StubProvider::new(Ok("x".into())), channel.clone());

        assert!(!bot.handle(incoming("Alice", "!summarize many")).await);
        assert_eq!(channel.replies(), vec![reply::invalid_count("!")]);
    }

    #[tokio::test]
    async fn cache_summary_covers_cached_messages() {
        let channel = StubChannel::new(None);
        let provider = StubProvider::new(Ok("Alice and Bob planned lunch.".into()));
        let bot = controller(provider.clone(), channel.clone());

        bot.handle(incoming("Alice", "lunch at noon?")).await;
        bot.handle(incoming("Bob", "sure")).await;
        assert!(bot.handle(incoming("Alice", "!sumcache")).await);
        bot.wait_for_summaries().await;

        let replies = channel.replies();
        assert_eq!(replies[0], reply::PROGRESS_CACHE);
        assert!(replies[1].contains("Alice and Bob planned lunch."));
        assert!(replies[1].contains("• Messages analyzed: 3"));

        let prompts = provider.prompts();
        assert!(prompts[0].contains("Alice: lunch at noon?\nBob: sure\nAlice: !sumcache"));
    }

    #[tokio::test]
    async fn summarize_uses_channel_history_when_available() {
        let history = vec![
            incoming("Carol", "old news"),
            incoming("Dave", "the deploy is green"),
            incoming("Erin", "   "),
        ];
        let channel = StubChannel::new(Some(history));
        let provider = StubProvider::new(Ok("Deploy succeeded.".into()));
        let bot = controller(provider.clone(), channel.clone());

        assert!(bot.handle(incoming("Alice", "!summarize 2")).await);
        bot.wait_for_summaries().await;

        let prompts = provider.prompts();
        assert!(prompts[0].contains("Dave: the deploy is green"));
        assert!(!prompts[0].contains("old news"));
        assert!(channel.replies()[1].contains("• Channel: general"));
    }

    #[tokio::test]
    async fn summarize_falls_back_to_cache_without_history() {
        let channel = StubChannel::new(None);
        let provider = StubProvider::new(Ok("Short chat.".into()));
        let bot = controller(provider.clone(), channel.clone());

        bot.handle(incoming("Alice", "first")).await;
        bot.handle(incoming("Bob", "second")).await;
        assert!(bot.handle(incoming("Alice", "!sum 2")).await);
        bot.wait_for_summaries().await;

        let prompts = provider.prompts();
        assert!(prompts[0].contains("Bob: second\nAlice: !sum 2"));
        assert!(!prompts[0].contains("first"));
        assert_eq!(channel.replies()[0], reply::PROGRESS_HISTORY);
    }

    #[tokio::test]
    async fn failure_is_reported_and_published() {
        let channel = StubChannel::new(None);
        let provider = StubProvider::new(Err(ProviderError::Network("refused".into())));
        let events = Arc::new(EventBus::new(16));
        let mut rx = events.subscribe();
        let bot = controller(provider, channel.clone()).with_event_bus(events);

        bot.handle(incoming("Alice", "hello")).await;
        assert!(bot.handle(incoming("Alice", "!sumcache")).await);
        bot.wait_for_summaries().await;

        assert_eq!(channel.replies().last().unwrap(), reply::FAILED_CACHE);
        assert_eq!(bot.cache().len("room").await, 2);

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event.as_ref(), DomainEvent::SummaryFailed { .. }) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn run_drains_stream_and_skips_errors() {
        let channel = StubChannel::new(None);
        let bot = controller(StubProvider::new(Ok("x".into())), channel.clone());

        let (tx, rx) = mpsc::channel(8);
        tx.send(Ok(incoming("Alice", "one"))).await.unwrap();
        tx.send(Err(ChannelError::ConnectionLost("blip".into()))).await.unwrap();
        tx.send(Ok(incoming("Bob", "two"))).await.unwrap();
        drop(tx);

        bot.run(rx).await;
        assert_eq!(bot.cache().len("room").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_for_summary_started_before_stream_closed() {
        let channel = StubChannel::new(None);
        let provider = StubProvider::slow("Greetings were exchanged.", Duration::from_millis(200));
        let bot = controller(provider, channel.clone());

        let (tx, rx) = mpsc::channel(8);
        tx.send(Ok(incoming("Alice", "hello"))).await.unwrap();
        tx.send(Ok(incoming("Alice", "!sumcache"))).await.unwrap();
        drop(tx);

        bot.run(rx).await;

        let replies = channel.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], reply::PROGRESS_CACHE);
        assert!(replies[1].contains("Greetings were exchanged."));
    }

    #[tokio::test(start_paused = true)]
    async fn abort_cancels_summary_in_flight() {
        let channel = StubChannel::new(None);
        let provider = StubProvider::slow("never delivered", Duration::from_secs(60));
        let bot = controller(provider.clone(), channel.clone());

        bot.handle(incoming("Alice", "hello")).await;
        assert!(bot.handle(incoming("Alice", "!sumcache")).await);
        bot.abort_summaries().await;
        bot.wait_for_summaries().await;

        assert_eq!(channel.replies(), vec![reply::PROGRESS_CACHE.to_string()]);
        assert!(provider.prompts().is_empty());
    }
}
