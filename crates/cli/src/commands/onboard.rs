//! `chatdigest onboard` — First-time setup.

use chatdigest_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📝 chatdigest — First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!(
        "   1. Set DISCORD_TOKEN (or add discord.token to {})",
        config_path.display()
    );
    println!("   2. Enable the Message Content intent for the bot in the Developer Portal");
    println!("   3. Start Ollama and pull a model: ollama pull mistral");
    println!("   4. Run: chatdigest run\n");
    println!("   Without Discord, try: chatdigest run --channel cli\n");

    Ok(())
}
