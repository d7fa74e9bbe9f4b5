//! [`NatsBrokerSession`]: async-nats client lifecycle plus binding to a durable JetStream pull consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_nats::jetstream::consumer::PullConsumer;
use async_nats::{Client, ConnectOptions, Event};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use updater_core::{BrokerError, BrokerSession, ClosedCallback, FetchOptions, PullSubscription};

use crate::subscription::NatsPullSubscription;

/// Connection state observed through the client's event callback.
#[derive(Default)]
struct SessionFlags {
    draining: AtomicBool,
    closed: AtomicBool,
}

impl SessionFlags {
    fn reset(&self) {
        self.draining.store(false, Ordering::SeqCst);
        self.closed.store(false, Ordering::SeqCst);
    }

    fn on_event(&self, event: Event, on_closed: &ClosedCallback) {
        match event {
            Event::Connected => info!("NATS connection established"),
            Event::Disconnected => warn!("NATS connection lost, reconnecting"),
            Event::Draining => {
                debug!("NATS client draining");
                self.draining.store(true, Ordering::SeqCst);
            }
            Event::Closed => {
                if !self.closed.swap(true, Ordering::SeqCst) {
                    info!("NATS client closed");
                    on_closed();
                }
            }
            other => debug!(event = %other, "NATS client event"),
        }
    }
}

/// Broker session backed by an async-nats [`Client`]. Created disconnected; [`BrokerSession::connect`] opens it.
#[derive(Default)]
pub struct NatsBrokerSession {
    client: Mutex<Option<Client>>,
    flags: Arc<SessionFlags>,
}

impl NatsBrokerSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<Client, BrokerError> {
        self.client
            .lock()
            .map_err(|_| BrokerError::Connect("client lock poisoned".to_string()))?
            .clone()
            .ok_or(BrokerError::NotConnected)
    }
}

#[async_trait]
impl BrokerSession for NatsBrokerSession {
    #[instrument(skip(self, on_closed))]
    async fn connect(
        &self,
        url: &str,
        auto_reconnect: bool,
        on_closed: ClosedCallback,
    ) -> Result<(), BrokerError> {
        self.flags.reset();
        let flags = self.flags.clone();
        let mut options = ConnectOptions::new().event_callback(move |event| {
            let flags = flags.clone();
            let on_closed = on_closed.clone();
            async move { flags.on_event(event, &on_closed) }
        });
        if !auto_reconnect {
            options = options.max_reconnects(1);
        }

        let client = options
            .connect(url)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        info!(server = %url, "Connected to NATS server");

        *self
            .client
            .lock()
            .map_err(|_| BrokerError::Connect("client lock poisoned".to_string()))? = Some(client);
        Ok(())
    }

    async fn drain(&self) -> Result<(), BrokerError> {
        let client = self.client()?;
        self.flags.draining.store(true, Ordering::SeqCst);
        client
            .drain()
            .await
            .map_err(|e| BrokerError::Drain(e.to_string()))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let client = self
            .client
            .lock()
            .map_err(|_| BrokerError::Connect("client lock poisoned".to_string()))?
            .take();
        if client.is_none() {
            return Err(BrokerError::NotConnected);
        }
        self.flags.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_draining(&self) -> bool {
        self.flags.draining.load(Ordering::SeqCst)
    }

    fn is_closed(&self) -> bool {
        self.flags.closed.load(Ordering::SeqCst)
    }

    #[instrument(skip(self))]
    async fn pull_subscribe(
        &self,
        consumer: &str,
        stream: &str,
        options: FetchOptions,
    ) -> Result<Box<dyn PullSubscription>, BrokerError> {
        let jetstream = async_nats::jetstream::new(self.client()?);
        let pull_consumer: PullConsumer = jetstream
            .get_consumer_from_stream(consumer, stream)
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
        debug!(consumer, stream, "Bound to durable pull consumer");
        Ok(Box::new(NatsPullSubscription::new(pull_consumer, options)))
    }
}
