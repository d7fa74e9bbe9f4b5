//! # updater-cli
//!
//! Wires the Telegram bot session and the NATS broker session into a [`NatsUpdater`], plus the CLI parser
//! and config loading used by the `nats-updater` binary.

pub mod cli;

use std::sync::Arc;

use nats_updater::{NatsConfig, NatsUpdater};
use updater_nats::NatsBrokerSession;
use updater_telegram::TelegramBotSession;

pub use cli::{load_config, AppConfig, Cli, Commands, RunArgs};

pub type TelegramNatsUpdater = NatsUpdater<TelegramBotSession>;

/// Either a bot token or an already configured teloxide Bot (custom API URL, client, ...).
pub enum BotSource {
    Token(String),
    Bot(teloxide::Bot),
}

impl From<String> for BotSource {
    fn from(token: String) -> Self {
        Self::Token(token)
    }
}

impl From<&str> for BotSource {
    fn from(token: &str) -> Self {
        Self::Token(token.to_string())
    }
}

impl From<teloxide::Bot> for BotSource {
    fn from(bot: teloxide::Bot) -> Self {
        Self::Bot(bot)
    }
}

/// Builds an updater that pulls Telegram updates from NATS. Nothing connects until `initialize`.
pub fn create_updater(bot: impl Into<BotSource>, config: NatsConfig) -> TelegramNatsUpdater {
    let bot = match bot.into() {
        BotSource::Token(token) => teloxide::Bot::new(token),
        BotSource::Bot(bot) => bot,
    };
    NatsUpdater::new(
        Arc::new(TelegramBotSession::new(bot)),
        Arc::new(NatsBrokerSession::new()),
        config,
    )
}
