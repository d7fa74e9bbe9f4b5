//! # Poll loop
//!
//! Fetch → decode → enqueue → ack against the durable pull consumer, until the updater stops running or the
//! broker starts draining. Acking only after the update is queued gives at-least-once delivery: a crash
//! between enqueue and ack means redelivery, never loss.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};
use updater_core::{BotSession, BrokerSession, FetchError, FetchOptions, RawMessage};

use crate::error::Result;
use crate::queue::UpdateQueue;
use crate::state::UpdaterState;

pub const DEFAULT_UNAVAILABLE_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Options for [`crate::NatsUpdater::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Update types the webhook should deliver; `None` keeps the bot API's current setting.
    pub allowed_updates: Option<Vec<String>>,
    pub fetch: FetchOptions,
    /// Sleep after the broker reports the service temporarily unavailable.
    pub unavailable_backoff: Duration,
    /// Sleep after any other fetch failure. Zero retries immediately.
    pub error_backoff: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            allowed_updates: None,
            fetch: FetchOptions::default(),
            unavailable_backoff: DEFAULT_UNAVAILABLE_BACKOFF,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

impl PollOptions {
    pub fn with_allowed_updates<I, S>(mut self, updates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_updates = Some(updates.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_fetch(mut self, batch_size: usize, wait: Duration) -> Self {
        self.fetch = FetchOptions { batch_size, wait };
        self
    }

    pub fn with_unavailable_backoff(mut self, backoff: Duration) -> Self {
        self.unavailable_backoff = backoff;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

/// Everything the spawned poll task needs. It talks back to the updater only through `state.running`,
/// the broker session and the queue.
pub(crate) struct PollLoop<B: BotSession> {
    pub bot: Arc<B>,
    pub broker: Arc<dyn BrokerSession>,
    pub state: Arc<UpdaterState>,
    pub queue: UpdateQueue<B::Update>,
    pub consumer_name: String,
    pub stream_name: String,
    pub options: PollOptions,
}

impl<B: BotSession> PollLoop<B> {
    fn should_continue(&self) -> bool {
        self.state.is_running() && !(self.broker.is_draining() || self.broker.is_closed())
    }

    /// Runs until stopped. Returns `Err` only when binding the subscription fails or a payload cannot be decoded.
    #[instrument(skip(self), fields(consumer = %self.consumer_name, stream = %self.stream_name))]
    pub async fn run(self) -> Result<()> {
        let mut subscription = self
            .broker
            .pull_subscribe(&self.consumer_name, &self.stream_name, self.options.fetch)
            .await?;
        info!("Poll loop started");

        while self.should_continue() {
            let messages = match subscription.fetch().await {
                Ok(messages) => messages,
                Err(FetchError::Timeout) => continue,
                Err(FetchError::ServiceUnavailable(reason)) => {
                    warn!(
                        reason = %reason,
                        backoff_ms = self.options.unavailable_backoff.as_millis() as u64,
                        "NATS service unavailable, retrying after a short wait"
                    );
                    tokio::time::sleep(self.options.unavailable_backoff).await;
                    continue;
                }
                Err(FetchError::Other(reason)) => {
                    error!(reason = %reason, "Unknown error while fetching messages");
                    if !self.options.error_backoff.is_zero() {
                        tokio::time::sleep(self.options.error_backoff).await;
                    }
                    continue;
                }
            };

            if !self.state.is_running() {
                warn!(
                    count = messages.len(),
                    "Updater stopped during fetch, returning fetched messages for redelivery"
                );
                // Sequential on purpose: redelivery order follows batch order.
                for message in messages {
                    nak_logged(message).await;
                }
                continue;
            }

            self.deliver(messages).await?;
        }

        info!("Poll loop finished");
        Ok(())
    }

    async fn deliver(&self, messages: Vec<Box<dyn RawMessage>>) -> Result<()> {
        debug!(count = messages.len(), "Delivering fetched batch");
        let mut pending = messages.into_iter();
        while let Some(message) = pending.next() {
            let update = match B::decode_update(&self.bot, message.payload()) {
                Ok(update) => update,
                Err(e) => {
                    error!(
                        subject = %message.subject(),
                        error = %e,
                        "Failed to decode update, stopping poll loop"
                    );
                    nak_logged(message).await;
                    for rest in pending {
                        nak_logged(rest).await;
                    }
                    return Err(e.into());
                }
            };
            self.queue.push(update);
            if let Err(e) = message.ack().await {
                warn!(error = %e, "Failed to ack delivered message; broker will redeliver it");
            }
        }
        Ok(())
    }
}

async fn nak_logged(message: Box<dyn RawMessage>) {
    if let Err(e) = message.nak().await {
        warn!(error = %e, "Failed to nak message; broker will redeliver it after ack wait");
    }
}
