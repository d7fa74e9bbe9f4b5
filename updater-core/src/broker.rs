//! Broker session abstraction: connection lifecycle, durable pull subscription and fetched messages.
//!
//! Transport-agnostic; `updater-nats` implements it on top of NATS JetStream, tests use an in-memory mock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BrokerError, FetchError};

/// Invoked once by the broker session when its connection is closed for good.
pub type ClosedCallback = Arc<dyn Fn() + Send + Sync>;

/// How a single pull fetch behaves: at most `batch_size` messages, waiting at most `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub batch_size: usize,
    pub wait: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            wait: Duration::from_secs(5),
        }
    }
}

/// Connection to the durable-stream service.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Connects to `url`. `on_closed` must be called once the connection is closed (after drain or close).
    async fn connect(
        &self,
        url: &str,
        auto_reconnect: bool,
        on_closed: ClosedCallback,
    ) -> Result<(), BrokerError>;

    /// Stops delivery of new messages and closes the connection once in-flight work is flushed.
    async fn drain(&self) -> Result<(), BrokerError>;

    /// Releases the connection.
    async fn close(&self) -> Result<(), BrokerError>;

    fn is_draining(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Binds to an existing durable pull consumer `consumer` on `stream`.
    async fn pull_subscribe(
        &self,
        consumer: &str,
        stream: &str,
        options: FetchOptions,
    ) -> Result<Box<dyn PullSubscription>, BrokerError>;
}

/// Pull-style subscription bound to one durable consumer.
#[async_trait]
pub trait PullSubscription: Send {
    /// One network round trip. An empty wait is reported as [`FetchError::Timeout`].
    async fn fetch(&mut self) -> Result<Vec<Box<dyn RawMessage>>, FetchError>;
}

/// A fetched message. `ack` and `nak` consume it, so a message gets at most one terminal operation.
#[async_trait]
pub trait RawMessage: Send + Sync {
    fn payload(&self) -> &[u8];

    fn subject(&self) -> &str;

    /// Acknowledges the message; the broker will not redeliver it.
    async fn ack(self: Box<Self>) -> Result<(), BrokerError>;

    /// Negatively acknowledges the message; the broker requeues it for redelivery.
    async fn nak(self: Box<Self>) -> Result<(), BrokerError>;
}
