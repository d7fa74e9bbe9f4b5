//! # updater-telegram
//!
//! Telegram side of the updater: [`TelegramBotSession`] (teloxide-backed [`updater_core::BotSession`]),
//! [`BotUpdate`] decoding, minimal config. Knows nothing about NATS.

mod bot_session;
mod config;
mod update;

pub use bot_session::{parse_allowed_updates, TelegramBotSession};
pub use config::TelegramConfig;
pub use update::BotUpdate;
