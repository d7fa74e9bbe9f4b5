//! JetStream pull subscription and message handle.

use async_nats::jetstream::consumer::PullConsumer;
use async_nats::jetstream::{self, AckKind};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::warn;
use updater_core::{BrokerError, FetchError, FetchOptions, PullSubscription, RawMessage};

/// Maps an async-nats error to the loop's fetch taxonomy by its message.
///
/// async-nats reports JetStream 503 / no-responders and request timeouts through several error kinds
/// depending on where the failure happens, so the rendered text is the common denominator.
pub(crate) fn classify_fetch_error(err: impl std::fmt::Display) -> FetchError {
    let text = err.to_string();
    let lower = text.to_lowercase();
    if lower.contains("no responders") || lower.contains("503") || lower.contains("unavailable") {
        FetchError::ServiceUnavailable(text)
    } else if lower.contains("timed out") || lower.contains("timeout") {
        FetchError::Timeout
    } else {
        FetchError::Other(text)
    }
}

pub struct NatsPullSubscription {
    consumer: PullConsumer,
    options: FetchOptions,
}

impl NatsPullSubscription {
    pub fn new(consumer: PullConsumer, options: FetchOptions) -> Self {
        Self { consumer, options }
    }
}

#[async_trait]
impl PullSubscription for NatsPullSubscription {
    async fn fetch(&mut self) -> Result<Vec<Box<dyn RawMessage>>, FetchError> {
        let mut batch = self
            .consumer
            .fetch()
            .max_messages(self.options.batch_size)
            .expires(self.options.wait)
            .messages()
            .await
            .map_err(classify_fetch_error)?;

        let mut messages: Vec<Box<dyn RawMessage>> = Vec::new();
        while let Some(next) = batch.next().await {
            match next {
                Ok(message) => messages.push(Box::new(NatsRawMessage { message })),
                // Hand back what already arrived; returning an error here would strand those messages.
                Err(e) if !messages.is_empty() => {
                    warn!(error = %e, received = messages.len(), "Fetch batch ended early");
                    break;
                }
                Err(e) => return Err(classify_fetch_error(e)),
            }
        }

        if messages.is_empty() {
            return Err(FetchError::Timeout);
        }
        Ok(messages)
    }
}

pub struct NatsRawMessage {
    message: jetstream::Message,
}

#[async_trait]
impl RawMessage for NatsRawMessage {
    fn payload(&self) -> &[u8] {
        self.message.payload.as_ref()
    }

    fn subject(&self) -> &str {
        self.message.subject.as_str()
    }

    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        self.message
            .ack()
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }

    async fn nak(self: Box<Self>) -> Result<(), BrokerError> {
        self.message
            .ack_with(AckKind::Nak(None))
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }
}
