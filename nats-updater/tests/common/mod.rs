//! In-memory broker and bot sessions for driving `NatsUpdater` without NATS or Telegram.
//!
//! - `MockBroker` replays a script of fetch results and records every ack/nak by message subject.
//! - `MockBot` decodes `{"update_id": .., "text": ..}` payloads and records lifecycle and webhook calls.
//! - Call counters let tests assert exactly how many broker/bot operations happened.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use nats_updater::{NatsConfig, NatsUpdater};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use updater_core::{
    BotError, BotSession, BrokerError, BrokerSession, ClosedCallback, DecodeError, FetchError,
    FetchOptions, PullSubscription, RawMessage, WebhookRegistration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ack,
    Nak,
}

/// One scripted result of `PullSubscription::fetch`.
pub enum FetchStep {
    Batch(Vec<Vec<u8>>),
    Unavailable,
    Timeout,
    Error,
    /// Signals `started`, waits for `release`, then returns the batch. Used to stop the updater mid-fetch.
    Gated {
        started: oneshot::Sender<()>,
        release: oneshot::Receiver<()>,
        payloads: Vec<Vec<u8>>,
    },
}

type Outcomes = Arc<Mutex<Vec<(String, Outcome)>>>;

pub struct MockBroker {
    pub connect_calls: AtomicUsize,
    pub drain_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub fetch_calls: Arc<AtomicUsize>,
    pub fail_connect: AtomicBool,
    pub fail_subscribe: AtomicBool,
    draining: AtomicBool,
    closed: Arc<AtomicBool>,
    on_closed: Mutex<Option<ClosedCallback>>,
    script: Arc<Mutex<VecDeque<FetchStep>>>,
    outcomes: Outcomes,
    next_id: Arc<AtomicUsize>,
    idle_wait: Duration,
}

impl Default for MockBroker {
    fn default() -> Self {
        Self {
            connect_calls: AtomicUsize::new(0),
            drain_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            fail_connect: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            closed: Arc::new(AtomicBool::new(false)),
            on_closed: Mutex::new(None),
            script: Arc::new(Mutex::new(VecDeque::new())),
            outcomes: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
            idle_wait: Duration::from_millis(10),
        }
    }
}

impl MockBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_step(&self, step: FetchStep) {
        self.script.lock().unwrap().push_back(step);
    }

    /// Every terminal operation so far, as (subject, outcome), in the order they happened.
    pub fn outcomes(&self) -> Vec<(String, Outcome)> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn count(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Simulates the server closing the connection on its own.
    pub fn close_from_server(&self) {
        self.draining.store(true, Ordering::SeqCst);
        self.fire_closed();
    }

    fn fire_closed(&self) {
        mark_closed(&self.closed, self.on_closed.lock().unwrap().clone());
    }
}

fn mark_closed(closed: &AtomicBool, on_closed: Option<ClosedCallback>) {
    if !closed.swap(true, Ordering::SeqCst) {
        if let Some(callback) = on_closed {
            callback();
        }
    }
}

#[async_trait]
impl BrokerSession for MockBroker {
    async fn connect(
        &self,
        _url: &str,
        _auto_reconnect: bool,
        on_closed: ClosedCallback,
    ) -> Result<(), BrokerError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(BrokerError::Connect("connection refused".to_string()));
        }
        self.draining.store(false, Ordering::SeqCst);
        self.closed.store(false, Ordering::SeqCst);
        *self.on_closed.lock().unwrap() = Some(on_closed);
        Ok(())
    }

    // Like async-nats: drain only queues the request; the closed event arrives later from another task.
    async fn drain(&self) -> Result<(), BrokerError> {
        self.drain_calls.fetch_add(1, Ordering::SeqCst);
        self.draining.store(true, Ordering::SeqCst);
        let closed = self.closed.clone();
        let on_closed = self.on_closed.lock().unwrap().clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            mark_closed(&closed, on_closed);
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn pull_subscribe(
        &self,
        _consumer: &str,
        _stream: &str,
        _options: FetchOptions,
    ) -> Result<Box<dyn PullSubscription>, BrokerError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(BrokerError::Subscribe("consumer not found".to_string()));
        }
        Ok(Box::new(MockSubscription {
            script: self.script.clone(),
            fetch_calls: self.fetch_calls.clone(),
            outcomes: self.outcomes.clone(),
            next_id: self.next_id.clone(),
            idle_wait: self.idle_wait,
        }))
    }
}

struct MockSubscription {
    script: Arc<Mutex<VecDeque<FetchStep>>>,
    fetch_calls: Arc<AtomicUsize>,
    outcomes: Outcomes,
    next_id: Arc<AtomicUsize>,
    idle_wait: Duration,
}

impl MockSubscription {
    fn messages(&self, payloads: Vec<Vec<u8>>) -> Vec<Box<dyn RawMessage>> {
        payloads
            .into_iter()
            .map(|payload| {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                Box::new(MockMessage {
                    subject: format!("msg-{}", id),
                    payload,
                    outcomes: self.outcomes.clone(),
                }) as Box<dyn RawMessage>
            })
            .collect()
    }
}

#[async_trait]
impl PullSubscription for MockSubscription {
    async fn fetch(&mut self) -> Result<Vec<Box<dyn RawMessage>>, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(FetchStep::Batch(payloads)) => Ok(self.messages(payloads)),
            Some(FetchStep::Unavailable) => Err(FetchError::ServiceUnavailable("503".to_string())),
            Some(FetchStep::Timeout) => Err(FetchError::Timeout),
            Some(FetchStep::Error) => Err(FetchError::Other("boom".to_string())),
            Some(FetchStep::Gated {
                started,
                release,
                payloads,
            }) => {
                let _ = started.send(());
                let _ = release.await;
                Ok(self.messages(payloads))
            }
            None => {
                tokio::time::sleep(self.idle_wait).await;
                Err(FetchError::Timeout)
            }
        }
    }
}

struct MockMessage {
    subject: String,
    payload: Vec<u8>,
    outcomes: Outcomes,
}

#[async_trait]
impl RawMessage for MockMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        self.outcomes
            .lock()
            .unwrap()
            .push((self.subject.clone(), Outcome::Ack));
        Ok(())
    }

    async fn nak(self: Box<Self>) -> Result<(), BrokerError> {
        self.outcomes
            .lock()
            .unwrap()
            .push((self.subject.clone(), Outcome::Nak));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestUpdate {
    pub update_id: u64,
    pub text: String,
}

pub struct MockUpdate {
    pub data: TestUpdate,
    pub bot: Weak<MockBot>,
}

#[derive(Default)]
pub struct MockBot {
    pub initialize_calls: AtomicUsize,
    pub shutdown_calls: AtomicUsize,
    pub fail_initialize: AtomicBool,
    pub fail_webhook: AtomicBool,
    /// Holds `set_webhook` open this long, so overlapping `start` calls really overlap.
    pub webhook_delay_ms: AtomicU64,
    webhooks: Mutex<Vec<WebhookRegistration>>,
}

impl MockBot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn webhooks(&self) -> Vec<WebhookRegistration> {
        self.webhooks.lock().unwrap().clone()
    }

    pub fn count(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BotSession for MockBot {
    type Update = MockUpdate;

    async fn initialize(&self) -> Result<(), BotError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(BotError::Api("Unauthorized".to_string()));
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), BotError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_webhook(&self, registration: &WebhookRegistration) -> Result<(), BotError> {
        let delay = self.webhook_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_webhook.load(Ordering::SeqCst) {
            return Err(BotError::Api("Bad Request: bad webhook".to_string()));
        }
        self.webhooks.lock().unwrap().push(registration.clone());
        Ok(())
    }

    fn decode_update(session: &Arc<Self>, payload: &[u8]) -> Result<MockUpdate, DecodeError> {
        Ok(MockUpdate {
            data: serde_json::from_slice(payload)?,
            bot: Arc::downgrade(session),
        })
    }
}

pub fn payload(update_id: u64, text: &str) -> Vec<u8> {
    serde_json::to_vec(&TestUpdate {
        update_id,
        text: text.to_string(),
    })
    .unwrap()
}

pub fn test_config() -> NatsConfig {
    NatsConfig::builder()
        .url("nats://localhost:4222")
        .consumer_name("bot-consumer")
        .stream_name("telegram-updates")
        .receiver_url("https://receiver.example.com/webhook")
        .receiver_secret("s3cret")
        .build()
        .unwrap()
}

pub fn updater(bot: &Arc<MockBot>, broker: &Arc<MockBroker>) -> NatsUpdater<MockBot> {
    NatsUpdater::new(bot.clone(), broker.clone(), test_config())
}
