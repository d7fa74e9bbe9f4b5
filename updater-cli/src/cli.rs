//! CLI parser and config loading.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nats_updater::{NatsConfig, PollOptions};
use updater_telegram::TelegramConfig;

pub const DEFAULT_LOG_FILE: &str = "logs/nats-updater.log";

#[derive(Parser)]
#[command(name = "nats-updater")]
#[command(about = "Telegram bot updates via a NATS JetStream durable consumer", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register the receiver webhook and log updates pulled from NATS until Ctrl-C.
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Bot token; overrides BOT_TOKEN.
    #[arg(short, long)]
    pub token: Option<String>,

    /// Update type the webhook should deliver (repeatable), e.g. `--allowed-update message`.
    #[arg(long = "allowed-update")]
    pub allowed_updates: Vec<String>,

    /// Max messages per fetch.
    #[arg(long, default_value = "10")]
    pub batch_size: usize,

    /// Seconds a fetch waits for messages before reporting idle.
    #[arg(long, default_value = "5")]
    pub fetch_wait_secs: u64,

    /// Prefix of the NATS env vars (`<prefix>SERVER_URL`, ...).
    #[arg(long, default_value = nats_updater::DEFAULT_ENV_PREFIX)]
    pub env_prefix: String,
}

impl RunArgs {
    pub fn poll_options(&self) -> PollOptions {
        let options = PollOptions::default()
            .with_fetch(self.batch_size, Duration::from_secs(self.fetch_wait_secs));
        if self.allowed_updates.is_empty() {
            options
        } else {
            options.with_allowed_updates(self.allowed_updates.iter().cloned())
        }
    }
}

/// Everything the binary needs: Telegram access and NATS connection parameters.
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub nats: NatsConfig,
}

impl AppConfig {
    pub fn log_file(&self) -> &str {
        self.telegram.log_file.as_deref().unwrap_or(DEFAULT_LOG_FILE)
    }
}

/// Loads config from env. If `token` is provided it overrides BOT_TOKEN.
pub fn load_config(token: Option<String>, env_prefix: &str) -> Result<AppConfig> {
    let telegram = TelegramConfig::load(token)?;
    let nats = NatsConfig::from_env_with_prefix(env_prefix)
        .with_context(|| format!("Load NATS config from {}* env vars", env_prefix))?;
    Ok(AppConfig { telegram, nats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["nats-updater", "run"]).unwrap();
        let Commands::Run(args) = cli.command;

        assert!(args.token.is_none());
        assert_eq!(args.env_prefix, "NATS_");
        let options = args.poll_options();
        assert!(options.allowed_updates.is_none());
        assert_eq!(options.fetch.batch_size, 10);
        assert_eq!(options.fetch.wait, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_run_with_allowed_updates() {
        let cli = Cli::try_parse_from([
            "nats-updater",
            "run",
            "--allowed-update",
            "message",
            "--allowed-update",
            "callback_query",
            "--batch-size",
            "1",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command;

        let options = args.poll_options();
        assert_eq!(
            options.allowed_updates,
            Some(vec!["message".to_string(), "callback_query".to_string()])
        );
        assert_eq!(options.fetch.batch_size, 1);
    }

    #[test]
    #[serial]
    fn test_load_config_reports_missing_nats_setting() {
        for name in ["SERVER_URL", "CONSUMER_NAME", "STREAM_NAME", "RECEIVER_URL", "RECEIVER_SECRET"] {
            env::remove_var(format!("CLI_TEST_{}", name));
        }
        env::remove_var("LOG_FILE");

        let err = load_config(Some("token".to_string()), "CLI_TEST_").err().unwrap();
        assert!(format!("{:#}", err).contains("SERVER_URL"));
    }

    #[test]
    #[serial]
    fn test_load_config_default_log_file() {
        let vars = [
            ("SERVER_URL", "nats://localhost:4222"),
            ("CONSUMER_NAME", "consumer"),
            ("STREAM_NAME", "stream"),
            ("RECEIVER_URL", "https://receiver/hook"),
            ("RECEIVER_SECRET", "secret"),
        ];
        for (name, value) in vars {
            env::set_var(format!("CLI_TEST_{}", name), value);
        }
        env::remove_var("LOG_FILE");

        let config = load_config(Some("token".to_string()), "CLI_TEST_").unwrap();
        assert_eq!(config.telegram.bot_token, "token");
        assert_eq!(config.nats.stream_name(), "stream");
        assert_eq!(config.log_file(), DEFAULT_LOG_FILE);

        for (name, _) in vars {
            env::remove_var(format!("CLI_TEST_{}", name));
        }
    }
}
