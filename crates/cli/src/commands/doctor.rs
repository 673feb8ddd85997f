//! `chatdigest doctor` — Diagnose config and inference connectivity.

use chatdigest_channels::{DiscordChannel, DiscordConfig};
use chatdigest_config::AppConfig;
use chatdigest_core::channel::Channel;
use chatdigest_summarizer::SummarizationClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 chatdigest Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found");
    } else {
        println!("  ⚠️  No config file — defaults in use (run `chatdigest onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running further checks.");
            return Ok(());
        }
    };

    match config.require_discord_token() {
        Ok(token) => {
            println!("  ✅ Discord token configured");
            let discord = DiscordChannel::new(DiscordConfig::new(token));
            match discord.health_check().await {
                Ok(true) => println!("  ✅ Discord accepted the bot token"),
                Ok(false) => {
                    println!("  ❌ Discord token is empty");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Discord API check failed: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ⚠️  {e} — only `chatdigest run --channel cli` will work");
            issues += 1;
        }
    }

    let keyed_backend = config.inference.provider != "ollama";
    if keyed_backend && config.inference.api_key.is_none() {
        println!(
            "  ℹ️  No API key set for {} (CHATDIGEST_API_KEY); fine for local servers",
            config.inference.provider
        );
    }

    let provider = chatdigest_providers::build_from_config(&config);
    let summarizer = SummarizationClient::from_config(provider.clone(), &config.inference);
    if summarizer.test_connection().await {
        println!(
            "  ✅ {} reachable at {}",
            provider.name(),
            config.inference.host
        );

        match provider.list_models().await {
            Ok(models) if models.iter().any(|m| model_matches(m, &config.inference.model)) => {
                println!("  ✅ Model '{}' available", config.inference.model);
            }
            Ok(models) if models.is_empty() => {
                println!("  ⚠️  Service reports no models");
                issues += 1;
            }
            Ok(_) => {
                println!(
                    "  ⚠️  Model '{}' not found — pull it first (e.g. `ollama pull {}`)",
                    config.inference.model, config.inference.model
                );
                issues += 1;
            }
            Err(e) => {
                println!("  ⚠️  Could not list models: {e}");
                issues += 1;
            }
        }
    } else {
        println!(
            "  ❌ Cannot reach {} at {} — is the service running?",
            provider.name(),
            config.inference.host
        );
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Ollama lists models with a tag (`mistral:latest`); config usually omits it.
fn model_matches(listed: &str, configured: &str) -> bool {
    listed == configured
        || listed
            .split_once(':')
            .is_some_and(|(name, tag)| name == configured && tag == "latest")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_match_with_implicit_latest_tag() {
        assert!(model_matches("mistral", "mistral"));
        assert!(model_matches("mistral:latest", "mistral"));
        assert!(model_matches("llama3:8b", "llama3:8b"));
        assert!(!model_matches("llama3:8b", "llama3"));
        assert!(!model_matches("mistral-nemo:latest", "mistral"));
    }
}
