//! `chatdigest status` — Show the effective configuration.

use chatdigest_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("📝 chatdigest Status");
    println!("===================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Prefix:         {}", config.discord.prefix);
    println!(
        "  Discord token:  {}",
        if config.discord.token.is_some() { "set" } else { "missing" }
    );
    println!(
        "  Channels:       {}",
        if config.discord.channels.is_empty() {
            "all".to_string()
        } else {
            config.discord.channels.join(", ")
        }
    );
    println!("  Provider:       {}", config.inference.provider);
    println!("  Host:           {}", config.inference.host);
    println!(
        "  API key:        {}",
        if config.inference.api_key.is_some() { "set" } else { "not set" }
    );
    println!("  Model:          {}", config.inference.model);
    println!("  Temperature:    {}", config.inference.temperature);
    println!("  Max tokens:     {}", config.inference.max_tokens);
    println!("  Cache size:     {} per channel", config.summary.max_cached_messages);
    println!("  Char budget:    {}", config.summary.max_conversation_chars);
    println!("  History limit:  {}", config.summary.default_history_limit);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!(
            "\n  ⚠️  No config file — using defaults and environment (run `chatdigest onboard`)"
        );
    }

    Ok(())
}
