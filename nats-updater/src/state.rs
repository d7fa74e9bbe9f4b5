//! Updater state shared between the lifecycle controller, the poll task and the broker's close callback.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// One-shot flag set by the broker session's close callback and awaited by `shutdown`.
#[derive(Debug)]
pub struct ClosedSignal {
    tx: watch::Sender<bool>,
}

impl Default for ClosedSignal {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }
}

impl ClosedSignal {
    /// Sets the flag; returns false if it was already set.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|closed| !std::mem::replace(closed, true))
    }

    /// Re-arms the flag for a new connection.
    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the flag is set (immediately if it already is).
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// `running ⇒ initialized`. Transitions happen only in `NatsUpdater`; the poll task only reads `running`.
#[derive(Debug, Default)]
pub struct UpdaterState {
    initialized: AtomicBool,
    running: AtomicBool,
    pub(crate) broker_closed: ClosedSignal,
}

impl UpdaterState {
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_initialized(&self, value: bool) {
        self.initialized.store(value, Ordering::SeqCst);
    }

    pub(crate) fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::SeqCst);
    }
}
