//! Wraps teloxide::Bot and implements [`updater_core::BotSession`]. Production code talks to the Telegram
//! Bot API; tests substitute another session impl.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, Me};
use tracing::{debug, info, instrument};
use updater_core::{BotError, BotSession, DecodeError, WebhookRegistration};

use crate::update::BotUpdate;

/// Parses allowed update names (`"message"`, `"callback_query"`, ...) into teloxide's enum.
pub fn parse_allowed_updates(names: &[String]) -> Result<Vec<AllowedUpdate>, BotError> {
    names
        .iter()
        .map(|name| {
            serde_json::from_value(serde_json::Value::String(name.clone()))
                .map_err(|_| BotError::InvalidAllowedUpdate(name.clone()))
        })
        .collect()
}

/// Thin wrapper around teloxide::Bot that implements updater-core's BotSession.
#[derive(Debug)]
pub struct TelegramBotSession {
    bot: teloxide::Bot,
    me: Mutex<Option<Me>>,
}

impl TelegramBotSession {
    /// Creates a session from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self {
            bot,
            me: Mutex::new(None),
        }
    }

    /// Creates a session using the given Telegram bot token.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(teloxide::Bot::new(token))
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }

    /// Bot identity fetched by `initialize`; `None` before initialize or after shutdown.
    pub fn me(&self) -> Option<Me> {
        self.me.lock().ok().and_then(|me| me.clone())
    }

    fn set_me(&self, me: Option<Me>) {
        if let Ok(mut slot) = self.me.lock() {
            *slot = me;
        }
    }
}

#[async_trait]
impl BotSession for TelegramBotSession {
    type Update = BotUpdate;

    async fn initialize(&self) -> Result<(), BotError> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| BotError::Api(e.to_string()))?;
        info!(bot_username = %me.username(), "Bot initialized");
        self.set_me(Some(me));
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), BotError> {
        self.set_me(None);
        debug!("Bot session shut down");
        Ok(())
    }

    #[instrument(skip(self, registration), fields(url = %registration.url))]
    async fn set_webhook(&self, registration: &WebhookRegistration) -> Result<(), BotError> {
        let url = reqwest::Url::parse(&registration.url)
            .map_err(|e| BotError::InvalidUrl(format!("{}: {}", registration.url, e)))?;

        let mut request = self
            .bot
            .set_webhook(url)
            .secret_token(registration.secret_token.clone());
        if let Some(names) = &registration.allowed_updates {
            request = request.allowed_updates(parse_allowed_updates(names)?);
        }
        request.await.map_err(|e| BotError::Api(e.to_string()))?;

        info!("Webhook registered");
        Ok(())
    }

    fn decode_update(session: &Arc<Self>, payload: &[u8]) -> Result<BotUpdate, DecodeError> {
        BotUpdate::decode(payload, session)
    }
}
