//! nats-updater CLI: register the receiver webhook, pull Telegram updates from NATS and log them.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use updater_cli::{create_updater, load_config, Cli, Commands, RunArgs};
use updater_core::init_tracing;
use updater_telegram::BotUpdate;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
    }
}

fn log_update(update: &BotUpdate) {
    info!(
        update_id = update.id(),
        chat_id = ?update.chat_id(),
        "Received update"
    );
}

async fn run(args: RunArgs) -> Result<()> {
    let config = load_config(args.token.clone(), &args.env_prefix)?;
    init_tracing(config.log_file())?;

    info!(nats = ?config.nats, "Starting NATS updater");
    let bot = config.telegram.build_bot()?;
    let updater = create_updater(bot, config.nats);

    updater
        .initialize()
        .await
        .context("Initialize updater (NATS connection and bot)")?;
    let queue = updater
        .start(args.poll_options())
        .await
        .context("Start updater")?;
    let mut poll_task = updater
        .take_poll_task()
        .context("Poll task missing after start")?;
    info!("Updater running, press Ctrl-C to stop");

    let outcome = loop {
        tokio::select! {
            Some(update) = queue.recv() => log_update(&update),
            joined = &mut poll_task => {
                break match joined {
                    Ok(Ok(())) => {
                        info!("Poll loop ended");
                        Ok(())
                    }
                    Ok(Err(e)) => {
                        error!(error = %e, "Poll loop failed");
                        Err(anyhow::Error::new(e).context("Poll loop failed"))
                    }
                    Err(e) => Err(anyhow::anyhow!("Poll task panicked: {}", e)),
                };
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping");
                break Ok(());
            }
        }
    };

    if updater.running() {
        updater.stop().await?;
    }
    updater.shutdown().await?;
    info!("Updater shut down");
    outcome
}
