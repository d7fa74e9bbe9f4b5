//! # updater-core
//!
//! Core traits for the NATS updater: [`BrokerSession`] with its [`PullSubscription`] and [`RawMessage`],
//! [`BotSession`], error types and tracing initialization. Transport-agnostic; implemented by
//! updater-nats and updater-telegram and driven by nats-updater.

pub mod bot;
pub mod broker;
pub mod error;
pub mod logger;

pub use bot::{BotSession, WebhookRegistration};
pub use broker::{BrokerSession, ClosedCallback, FetchOptions, PullSubscription, RawMessage};
pub use error::{BotError, BrokerError, DecodeError, FetchError};
pub use logger::init_tracing;
