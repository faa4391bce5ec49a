mod bot;
mod config;
mod fanout;
mod housekeeping;
mod keepalive;
mod messages;
mod pending;
mod template;
mod translate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaypost=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Destination channels: {}", config.telegram.channel_ids.len());
    info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);
    info!("  Translation enabled: {}", config.translation.enabled);
    info!("  Pending TTL: {}s", config.pending.ttl_secs);

    // Telegram client with an explicit timeout so no send can hang the
    // update loop indefinitely.
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create Telegram HTTP client")?;
    let bot = Bot::with_client(&config.telegram.bot_token, client);

    // Create shared state
    let state = Arc::new(AppState::new(config.clone(), bot.clone())?);

    // Background jobs: expiry sweep and optional self-ping
    let _housekeeping = housekeeping::start(&config, Arc::clone(&state.store)).await?;

    // Liveness endpoint for the hosting platform
    if config.keepalive.enabled {
        let port = config.keepalive.port;
        tokio::spawn(async move {
            if let Err(e) = keepalive::serve(port).await {
                error!("Keep-alive server exited: {:#}", e);
            }
        });
    }

    // Run the Telegram bot
    info!("Bot is starting...");
    bot::run(bot, state).await?;

    Ok(())
}
