//! [`NatsUpdater`]: lifecycle controller around the broker session, bot session and poll task.
//!
//! `initialize`/`shutdown` acquire and release connections; `start`/`stop` turn consumption on and off and
//! are serialized by one async mutex so two poll loops can never be created.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use updater_core::{BotSession, BrokerSession, ClosedCallback, WebhookRegistration};

use crate::config::NatsConfig;
use crate::error::{Result, UpdaterError};
use crate::poll::{PollLoop, PollOptions};
use crate::queue::UpdateQueue;
use crate::state::UpdaterState;

/// Handle of the spawned poll task. Resolves to `Err` when the loop died on a decode or subscribe failure.
pub type PollTask = JoinHandle<Result<()>>;

pub struct NatsUpdater<B: BotSession> {
    bot: Arc<B>,
    broker: Arc<dyn BrokerSession>,
    config: NatsConfig,
    queue: UpdateQueue<B::Update>,
    state: Arc<UpdaterState>,
    lock: tokio::sync::Mutex<()>,
    poll_task: Mutex<Option<PollTask>>,
}

impl<B: BotSession> NatsUpdater<B> {
    pub fn new(bot: Arc<B>, broker: Arc<dyn BrokerSession>, config: NatsConfig) -> Self {
        Self {
            bot,
            broker,
            config,
            queue: UpdateQueue::new(),
            state: Arc::new(UpdaterState::default()),
            lock: tokio::sync::Mutex::new(()),
            poll_task: Mutex::new(None),
        }
    }

    pub fn bot(&self) -> &Arc<B> {
        &self.bot
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// The queue `start` returns; available before the first start.
    pub fn queue(&self) -> UpdateQueue<B::Update> {
        self.queue.clone()
    }

    pub fn running(&self) -> bool {
        self.state.is_running()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// Takes the handle of the most recently started poll task. Await it to observe loop failures,
    /// abort it to cancel without waiting for the loop to notice `stop` (an in-flight batch is then not nak'd).
    pub fn take_poll_task(&self) -> Option<PollTask> {
        self.poll_task.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Connects the broker, then initializes the bot. No-op when already initialized.
    ///
    /// A failure can leave the broker connected and the bot not; the updater stays uninitialized.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        if self.state.is_initialized() {
            debug!("Already initialized");
            return Ok(());
        }

        debug!(server = %self.config.url(), "Connecting to NATS server");
        self.state.broker_closed.reset();
        let state = self.state.clone();
        let on_closed: ClosedCallback = Arc::new(move || {
            state.broker_closed.set();
        });
        self.broker
            .connect(self.config.url(), true, on_closed)
            .await
            .map_err(UpdaterError::BrokerConnect)?;

        debug!("Initializing bot");
        self.bot
            .initialize()
            .await
            .map_err(UpdaterError::BotConnect)?;

        self.state.set_initialized(true);
        Ok(())
    }

    /// Drains and closes the broker, then shuts the bot down. Fails while running; no-op when not initialized.
    ///
    /// When the broker already reported closed, only warns: the bot is left as is and the updater stays
    /// initialized.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        if self.running() {
            return Err(UpdaterError::StillRunning);
        }

        if !self.state.is_initialized() {
            debug!("This Updater is already shut down");
            return Ok(());
        }

        if self.state.broker_closed.is_set() {
            warn!("NATS client is already closed");
            return Ok(());
        }

        info!("Draining NATS client");
        self.broker.drain().await?;
        self.state.broker_closed.wait().await;

        info!("Closing NATS client");
        self.broker.close().await?;

        debug!("Shutting down bot");
        self.bot.shutdown().await?;
        self.state.set_initialized(false);
        debug!("Shut down of Updater complete");
        Ok(())
    }

    /// Registers the webhook and spawns the poll loop. Returns the update queue.
    #[instrument(skip(self, options))]
    pub async fn start(&self, options: PollOptions) -> Result<UpdateQueue<B::Update>> {
        let _guard = self.lock.lock().await;
        if self.running() {
            return Err(UpdaterError::AlreadyRunning);
        }
        if !self.state.is_initialized() {
            return Err(UpdaterError::NotInitialized);
        }

        self.state.set_running(true);
        match self.launch(options).await {
            Ok(task) => {
                if let Ok(mut slot) = self.poll_task.lock() {
                    *slot = Some(task);
                }
                info!("Updater started");
                Ok(self.queue.clone())
            }
            Err(e) => {
                self.state.set_running(false);
                Err(e)
            }
        }
    }

    async fn launch(&self, options: PollOptions) -> Result<PollTask> {
        debug!(receiver_url = %self.config.receiver_url(), "Setting webhook for bot");
        let registration = WebhookRegistration {
            url: self.config.receiver_url().to_string(),
            secret_token: self.config.receiver_secret().to_string(),
            allowed_updates: options.allowed_updates.clone(),
        };
        self.bot.set_webhook(&registration).await?;

        let runtime = Handle::try_current().map_err(|e| UpdaterError::Spawn(e.to_string()))?;
        let poll = PollLoop {
            bot: self.bot.clone(),
            broker: self.broker.clone(),
            state: self.state.clone(),
            queue: self.queue.clone(),
            consumer_name: self.config.consumer_name().to_string(),
            stream_name: self.config.stream_name().to_string(),
            options,
        };
        Ok(runtime.spawn(poll.run()))
    }

    /// Clears `running` and drains the broker. Does not wait for the poll task to exit.
    ///
    /// The drained connection closes; call `shutdown` and `initialize` before starting again.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        if !self.running() {
            return Err(UpdaterError::NotRunning);
        }

        debug!("Stopping Updater");
        self.state.set_running(false);
        self.broker.drain().await?;
        debug!("Updater stop complete");
        Ok(())
    }

    /// Initializes, runs `f`, then shuts down (stopping first if `f` left the updater running).
    ///
    /// If initialize fails, `shutdown` is still attempted and the initialize error is returned.
    /// Otherwise the first error from `f`, stop or shutdown wins.
    pub async fn run_scoped<'a, F, Fut, T>(&'a self, f: F) -> Result<T>
    where
        F: FnOnce(&'a Self) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        if let Err(e) = self.initialize().await {
            if let Err(shutdown_err) = self.shutdown().await {
                warn!(error = %shutdown_err, "Shutdown after failed initialize also failed");
            }
            return Err(e);
        }

        let result = f(self).await;

        let stopped = if self.running() {
            self.stop().await
        } else {
            Ok(())
        };
        let shut_down = self.shutdown().await;

        let value = result?;
        stopped?;
        shut_down?;
        Ok(value)
    }
}
