//! Configuration loading, validation, and management for chatdigest.
//!
//! Loads configuration from `~/.chatdigest/config.toml`, then applies
//! environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatdigest/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Discord bot settings
    #[serde(default)]
    pub discord: DiscordSettings,

    /// Inference service settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Caching and truncation limits
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordSettings {
    /// Bot token from the Discord Developer Portal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Command prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Channel IDs to listen in; empty listens everywhere the bot can see
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
}

fn default_prefix() -> String {
    "!".into()
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            token: None,
            prefix: default_prefix(),
            channels: Vec::new(),
        }
    }
}

impl std::fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("token", &redact(&self.token))
            .field("prefix", &self.prefix)
            .field("channels", &self.channels)
            .finish()
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Backend kind: "ollama" for the native API, anything else is treated as
    /// an OpenAI-compatible endpoint
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the inference service
    #[serde(default = "default_host")]
    pub host: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output length in tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for a single inference call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer key for OpenAI-compatible endpoints that require one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "mistral".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    500
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            host: default_host(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("provider", &self.provider)
            .field("host", &self.host)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Messages kept per channel in the cache
    #[serde(default = "default_max_cached_messages")]
    pub max_cached_messages: usize,

    /// Character budget for a truncated conversation
    #[serde(default = "default_max_conversation_chars")]
    pub max_conversation_chars: usize,

    /// History depth for `summarize` when no count is given
    #[serde(default = "default_history_limit")]
    pub default_history_limit: usize,
}

fn default_max_cached_messages() -> usize {
    50
}
fn default_max_conversation_chars() -> usize {
    2000
}
fn default_history_limit() -> usize {
    20
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_cached_messages: default_max_cached_messages(),
            max_conversation_chars: default_max_conversation_chars(),
            default_history_limit: default_history_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatdigest/config.toml),
    /// then apply environment overrides:
    /// - `DISCORD_TOKEN`, `BOT_PREFIX`
    /// - `CHATDIGEST_PROVIDER`, `CHATDIGEST_API_KEY`, `OLLAMA_HOST`, `OLLAMA_MODEL`
    /// - `TEMPERATURE`, `MAX_TOKENS`
    /// - `MAX_MESSAGES_TO_SUMMARIZE`, `MAX_MESSAGE_LENGTH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.discord.token = Some(token);
        }
        if let Some(prefix) = lookup("BOT_PREFIX") {
            self.discord.prefix = prefix;
        }
        if let Some(provider) = lookup("CHATDIGEST_PROVIDER") {
            self.inference.provider = provider;
        }
        if let Some(key) = lookup("CHATDIGEST_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.inference.api_key = Some(key);
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.inference.host = host;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.inference.model = model;
        }
        if let Some(raw) = lookup("TEMPERATURE") {
            self.inference.temperature = parse_env("TEMPERATURE", &raw)?;
        }
        if let Some(raw) = lookup("MAX_TOKENS") {
            self.inference.max_tokens = parse_env("MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = lookup("MAX_MESSAGES_TO_SUMMARIZE") {
            self.summary.max_cached_messages = parse_env("MAX_MESSAGES_TO_SUMMARIZE", &raw)?;
        }
        if let Some(raw) = lookup("MAX_MESSAGE_LENGTH") {
            self.summary.max_conversation_chars = parse_env("MAX_MESSAGE_LENGTH", &raw)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatdigest")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.inference.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "inference.max_tokens must be > 0".into(),
            ));
        }
        if self.summary.max_cached_messages == 0 {
            return Err(ConfigError::ValidationError(
                "summary.max_cached_messages must be > 0".into(),
            ));
        }
        if self.summary.default_history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "summary.default_history_limit must be > 0".into(),
            ));
        }
        if self.discord.prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "discord.prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The Discord token, or an error naming the missing variable.
    pub fn require_discord_token(&self) -> Result<&str, ConfigError> {
        self.discord
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired(vec!["DISCORD_TOKEN".into()]))
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
