//! Bot session abstraction: API session lifecycle, webhook registration and update decoding.
//!
//! [`BotSession`] is transport-agnostic; `updater-telegram` implements it via teloxide.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BotError, DecodeError};

/// Webhook target the bot API should push updates to (the external receiver service).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRegistration {
    pub url: String,
    /// Sent by the bot API with every delivery so the receiver can verify the caller.
    pub secret_token: String,
    /// Update types to deliver; `None` keeps the API's current setting.
    pub allowed_updates: Option<Vec<String>>,
}

/// Chat-bot API session owned by the application; the updater only drives its lifecycle.
#[async_trait]
pub trait BotSession: Send + Sync + 'static {
    /// Decoded update handed to the application. Holds a non-owning link back to the session.
    type Update: Send + 'static;

    async fn initialize(&self) -> Result<(), BotError>;

    async fn shutdown(&self) -> Result<(), BotError>;

    async fn set_webhook(&self, registration: &WebhookRegistration) -> Result<(), BotError>;

    /// Parses a raw stream payload into an update bound to `session`.
    fn decode_update(session: &Arc<Self>, payload: &[u8]) -> Result<Self::Update, DecodeError>
    where
        Self: Sized;
}
