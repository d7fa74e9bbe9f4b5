//! Decoded Telegram update bound to the bot session that should act on it.

use std::sync::{Arc, Weak};

use teloxide::prelude::*;
use teloxide::types::{ChatId, Update};
use updater_core::{BotError, DecodeError};

use crate::bot_session::TelegramBotSession;

/// A Telegram update plus a non-owning link to its bot session.
///
/// The link never keeps the session alive: once the application drops the session,
/// convenience operations fail with [`BotError::SessionGone`].
#[derive(Debug, Clone)]
pub struct BotUpdate {
    update: Update,
    bot: Weak<TelegramBotSession>,
}

impl BotUpdate {
    /// Parses a webhook JSON body (as republished on the stream) into an update bound to `bot`.
    pub fn decode(payload: &[u8], bot: &Arc<TelegramBotSession>) -> Result<Self, DecodeError> {
        let update: Update = serde_json::from_slice(payload)?;
        Ok(Self {
            update,
            bot: Arc::downgrade(bot),
        })
    }

    pub fn update(&self) -> &Update {
        &self.update
    }

    pub fn into_inner(self) -> Update {
        self.update
    }

    pub fn id(&self) -> u32 {
        self.update.id.0
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.update.chat().map(|chat| chat.id.0)
    }

    /// The bot session, if it is still alive.
    pub fn bot(&self) -> Option<Arc<TelegramBotSession>> {
        self.bot.upgrade()
    }

    /// Sends `text` to the chat this update came from.
    pub async fn reply_text(&self, text: &str) -> Result<(), BotError> {
        let bot = self.bot().ok_or(BotError::SessionGone)?;
        let chat_id = self.chat_id().ok_or(BotError::NoChat)?;
        bot.inner()
            .send_message(ChatId(chat_id), text.to_string())
            .await
            .map_err(|e| BotError::Api(e.to_string()))?;
        Ok(())
    }
}
