//! Provider factory — builds the configured inference backend.
//!
//! One backend per process: `ollama` uses the native API, every other name is
//! treated as an OpenAI-compatible endpoint.

use std::sync::Arc;
use std::time::Duration;
use chatdigest_config::AppConfig;
use chatdigest_core::provider::Provider;
use tracing::info;
use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider described by `config.inference`.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let inference = &config.inference;
    let timeout = Duration::from_secs(inference.timeout_secs);

    let provider: Arc<dyn Provider> = if inference.provider == "ollama" {
        Arc::new(OllamaProvider::with_timeout(&inference.host, timeout))
    } else {
        let base_url = if inference.host == crate::ollama::DEFAULT_OLLAMA_HOST {
            default_base_url(&inference.provider)
        } else {
            inference.host.clone()
        };
        let api_key = inference.api_key.clone().unwrap_or_default();
        Arc::new(OpenAiCompatProvider::with_timeout(
            &inference.provider,
            base_url,
            api_key,
            timeout,
        ))
    };

    info!(
        provider = %provider.name(),
        model = %inference.model,
        "Inference provider ready"
    );
    provider
}

/// Get the default base URL for well-known OpenAI-compatible servers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "lmstudio" => "http://localhost:1234/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        _ => format!("{}/v1", crate::ollama::DEFAULT_OLLAMA_HOST),
    }
}
