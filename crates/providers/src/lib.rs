//! Inference service backends for chatdigest.
//!
//! All providers implement the `chatdigest_core::Provider` trait.
//! [`build_from_config`] picks the one named in configuration.

pub mod factory;
pub mod ollama;
pub mod openai_compat;

pub use factory::build_from_config;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
