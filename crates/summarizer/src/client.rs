//! Summarization client — prompt construction and the inference call.
//!
//! Stateless request/response: every call formats the messages, wraps them in
//! a fixed prompt, and asks the provider for a short summary. Provider errors
//! and blank output come back as [`SummarizeError`]; nothing is retried.

use std::sync::Arc;

use chatdigest_config::InferenceConfig;
use chatdigest_core::message::{ChatMessage, Message};
use chatdigest_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info, warn};

use crate::error::SummarizeError;

/// Returned for an empty conversation.
pub const NOTHING_TO_SUMMARIZE: &str = "No messages to summarize.";

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that summarizes conversations. \
Provide clear, concise summaries that capture the main points and key arguments.";

/// Render messages as `"{author}: {content}"` lines, skipping blank content.
pub fn format_conversation(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter_map(|m| {
            let content = m.content.trim();
            (!content.is_empty()).then(|| format!("{}: {}", m.author, content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap a formatted conversation in the summarization instructions.
pub fn build_prompt(conversation_text: &str) -> String {
    format!(
        "
Please provide a concise summary of the following conversation. Focus on:
- The main topic or subject being discussed
- Key points and arguments made by participants
- Any conclusions or decisions reached
- The overall tone and nature of the discussion

Conversation:
{conversation_text}

Please provide a clear, well-structured summary in 2-3 sentences.
"
    )
}

pub struct SummarizationClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl SummarizationClient {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &InferenceConfig) -> Self {
        Self::new(provider, &config.model, config.temperature, config.max_tokens)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Summarize a conversation.
    ///
    /// An empty conversation succeeds with [`NOTHING_TO_SUMMARIZE`] without
    /// contacting the provider.
    pub async fn summarize(&self, messages: &[ChatMessage]) -> Result<String, SummarizeError> {
        if messages.is_empty() {
            return Ok(NOTHING_TO_SUMMARIZE.to_string());
        }

        let prompt = build_prompt(&format_conversation(messages));
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(SYSTEM_INSTRUCTION), Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        };

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            messages = messages.len(),
            "Requesting summary"
        );

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = %self.provider.name(), error = %e, "Summarization call failed");
                return Err(SummarizeError::ServiceUnavailable(e));
            }
        };

        let summary = response.message.content.trim();
        if summary.is_empty() {
            warn!(model = %response.model, "Model returned an empty summary");
            return Err(SummarizeError::EmptyResponse);
        }

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Summary token usage"
            );
        }

        Ok(summary.to_string())
    }

    /// Probe the inference service by listing its models.
    pub async fn test_connection(&self) -> bool {
        match self.provider.list_models().await {
            Ok(models) => {
                info!(
                    provider = %self.provider.name(),
                    models = models.len(),
                    "Inference service reachable"
                );
                true
            }
            Err(e) => {
                warn!(
                    provider = %self.provider.name(),
                    error = %e,
                    "Inference connection test failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatdigest_core::error::ProviderError;
    use chatdigest_core::provider::ProviderResponse;
    use std::sync::Mutex;

    /// Replies with a fixed result and remembers the last request.
    struct MockProvider {
        reply: Result<String, ProviderError>,
        last_request: Mutex<Option<ProviderRequest>>,
        calls: Mutex<usize>,
    }

    impl MockProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                last_request: Mutex::new(None),
                calls: Mutex::new(0),
            }
        }

        fn failing(err: ProviderError) -> Self {
            Self {
                reply: Err(err),
                last_request: Mutex::new(None),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            *self.last_request.lock().unwrap() = Some(request);
            self.reply.clone().map(|text| ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model: "mock".into(),
            })
        }

        async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
            self.reply.clone().map(|_| vec!["mistral".to_string()])
        }
    }

    fn client(provider: Arc<MockProvider>) -> SummarizationClient {
        SummarizationClient::new(provider, "mistral", 0.3, 500)
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![ChatMessage::new("A", "hello"), ChatMessage::new("B", "hi")]
    }

    #[test]
    fn formats_conversation_lines() {
        assert_eq!(format_conversation(&conversation()), "A: hello\nB: hi");
    }

    #[test]
    fn format_skips_blank_and_trims() {
        let messages = vec![
            ChatMessage::new("A", "  padded  "),
            ChatMessage::new("B", "   "),
            ChatMessage::new("C", "last"),
        ];
        assert_eq!(format_conversation(&messages), "A: padded\nC: last");
        assert_eq!(format_conversation(&[]), "");
    }

    #[test]
    fn prompt_embeds_conversation_once() {
        let prompt = build_prompt("A: hello\nB: hi");
        assert!(prompt.contains("Conversation:\nA: hello\nB: hi\n"));
        assert!(prompt.contains("2-3 sentences"));
        assert!(prompt.contains("overall tone"));
        assert_eq!(prompt.matches("A: hello").count(), 1);
    }

    #[tokio::test]
    async fn empty_conversation_is_not_a_failure() {
        let provider = Arc::new(MockProvider::replying("unused"));
        let result = client(provider.clone()).summarize(&[]).await;
        assert_eq!(result.unwrap(), NOTHING_TO_SUMMARIZE);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn sends_system_and_user_messages_with_parameters() {
        let provider = Arc::new(MockProvider::replying("  They greeted each other.\n"));
        let summary = client(provider.clone()).summarize(&conversation()).await.unwrap();
        assert_eq!(summary, "They greeted each other.");

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "mistral");
        assert_eq!(request.max_tokens, Some(500));
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0], Message::system(SYSTEM_INSTRUCTION));
        assert!(request.messages[1].content.contains("A: hello\nB: hi"));
    }

    #[tokio::test]
    async fn blank_response_is_an_error() {
        let provider = Arc::new(MockProvider::replying(" \n "));
        let err = client(provider).summarize(&conversation()).await.unwrap_err();
        assert!(matches!(err, SummarizeError::EmptyResponse));
    }

    #[tokio::test]
    async fn provider_failure_is_an_error_not_a_panic() {
        let provider = Arc::new(MockProvider::failing(ProviderError::Network(
            "connection refused".into(),
        )));
        let summarizer = client(provider);
        let err = summarizer.summarize(&conversation()).await.unwrap_err();
        assert!(matches!(err, SummarizeError::ServiceUnavailable(ProviderError::Network(_))));

        // Stateless: the next call behaves the same way
        assert!(summarizer.summarize(&conversation()).await.is_err());
    }

    #[tokio::test]
    async fn connection_probe() {
        let up = client(Arc::new(MockProvider::replying("ok")));
        assert!(up.test_connection().await);

        let down = client(Arc::new(MockProvider::failing(ProviderError::Timeout("10s".into()))));
        assert!(!down.test_connection().await);
    }
}
