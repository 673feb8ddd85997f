//! `chatdigest run` — Start the bot on a channel.

use std::sync::Arc;

use chatdigest_bot::BotController;
use chatdigest_channels::{CliChannel, DiscordChannel, DiscordConfig};
use chatdigest_config::AppConfig;
use chatdigest_core::channel::Channel;
use chatdigest_summarizer::{MessageCache, SummarizationClient};
use tracing::{info, warn};

use crate::ChannelKind;

pub async fn run(kind: ChannelKind) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let channel: Arc<dyn Channel> = match kind {
        ChannelKind::Discord => {
            let token = config.require_discord_token()?;
            Arc::new(DiscordChannel::new(DiscordConfig {
                channel_filter: config.discord.channels.clone(),
                ..DiscordConfig::new(token)
            }))
        }
        ChannelKind::Cli => Arc::new(CliChannel::default()),
    };

    let provider = chatdigest_providers::build_from_config(&config);
    let summarizer = Arc::new(SummarizationClient::from_config(provider, &config.inference));
    if summarizer.test_connection().await {
        info!(
            model = %config.inference.model,
            host = %config.inference.host,
            "Inference service ready"
        );
    } else {
        warn!(
            host = %config.inference.host,
            "Inference service unreachable; summaries will fail until it is started \
             (e.g. `ollama serve`)"
        );
    }

    let cache = Arc::new(MessageCache::from_config(&config.summary));
    let controller = BotController::new(cache, summarizer, channel.clone(), &config);

    let incoming = channel.start().await?;
    info!(
        channel = %channel.name(),
        prefix = %config.discord.prefix,
        "Bot running; type {}help for commands",
        config.discord.prefix
    );

    tokio::select! {
        _ = controller.run(incoming) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            controller.abort_summaries().await;
        }
    }

    if let Err(e) = channel.stop().await {
        warn!(error = %e, "Channel did not stop cleanly");
    }
    Ok(())
}
