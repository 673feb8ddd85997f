//! chatdigest CLI — the main entry point.
//!
//! Commands:
//! - `run`      — Start the bot on Discord or a local terminal channel
//! - `status`   — Show the effective configuration
//! - `doctor`   — Diagnose config and inference connectivity
//! - `onboard`  — Write a default config file

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatdigest",
    about = "chatdigest — conversation summaries from a local LLM",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Where to listen for messages
        #[arg(short, long, value_enum, default_value_t = ChannelKind::Discord)]
        channel: ChannelKind,
    },

    /// Show the effective configuration
    Status,

    /// Diagnose configuration and inference connectivity
    Doctor,

    /// Write a default config file
    Onboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelKind {
    /// Discord gateway
    Discord,
    /// Local terminal, one line per message
    Cli,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { channel } => commands::run::run(channel).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
