use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use purgebot_channel_telegram::TelegramChannel;
use purgebot_cron::clock::OffsetClock;
use purgebot_gateway::AppState;
use purgebot_types::ChatMessage;

/// Delete Telegram messages at a scheduled time.
///
/// Reply to a message with "delete dd.mm.yyyy hh:mm" (or "today"/"tomorrow",
/// optionally "last N" and a second time for a window). "clear" cancels all
/// jobs; "lock"/"unlock" set a password on "clear"; "hey" lists the queue.
#[derive(Parser)]
#[command(name = "purgebot", version)]
struct Cli {
    /// Read the bot token from this file (overrides config, default ./TOKEN)
    #[arg(short, long)]
    token_file: Option<PathBuf>,

    /// Config file (default ./purgebot.json5, optional)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = purgebot_config::load_config(cli.config.as_deref())?;
    if let Some(token_file) = cli.token_file {
        config.token_file = token_file;
    }

    let token = config
        .read_token()
        .with_context(|| format!("failed to read token from {}", config.token_file.display()))?;
    let offset = config.utc_offset()?;
    info!(%offset, "Scheduling clock configured");

    let channel = Arc::new(TelegramChannel::new(&token)?);
    let state = Arc::new(AppState::new(Arc::new(OffsetClock::new(offset))));
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<ChatMessage>(256);

    channel.start(tx, &cancel).await?;

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    cancel.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
            }
        }
    });

    purgebot_gateway::run_bot(state, channel.clone(), rx, cancel).await;
    channel.stop().await?;

    Ok(())
}
