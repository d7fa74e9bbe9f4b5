//! # nats-updater
//!
//! Consumes bot updates that an external webhook receiver republished onto a NATS JetStream stream.
//! [`NatsUpdater`] registers the receiver as the bot's webhook, pulls from a durable consumer, decodes each
//! message through the [`updater_core::BotSession`], pushes it onto an [`UpdateQueue`] and acks it.
//! Lifecycle: `initialize` → `start` → `stop` → `shutdown`.
//!
//! `stop` drains the NATS connection and a drained connection closes, so a second `start` on the same
//! connection spawns a loop that exits at once. Restarting needs `shutdown` then `initialize`. If the
//! connection had already reported closed when `shutdown` runs, `shutdown` only warns and the updater
//! stays initialized, which makes the following `initialize` a no-op as well.

pub mod config;
pub mod error;
mod poll;
mod queue;
mod state;
mod updater;

pub use config::{NatsConfig, NatsConfigBuilder, DEFAULT_ENV_PREFIX};
pub use error::{ConfigError, Result, UpdaterError};
pub use poll::{PollOptions, DEFAULT_ERROR_BACKOFF, DEFAULT_UNAVAILABLE_BACKOFF};
pub use queue::UpdateQueue;
pub use state::ClosedSignal;
pub use updater::{NatsUpdater, PollTask};

// Unit tests live next to each module; lifecycle and poll-loop tests live in tests/.
