//! Output queue: the single point where decoded updates are handed to the application.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// Unbounded FIFO of updates. Cloning yields another handle to the same queue.
///
/// The updater is the only producer; the application is the single logical consumer.
pub struct UpdateQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    queued: Arc<AtomicUsize>,
}

impl<T> Clone for UpdateQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            queued: self.queued.clone(),
        }
    }
}

impl<T> fmt::Debug for UpdateQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQueue").field("len", &self.len()).finish()
    }
}

impl<T> Default for UpdateQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UpdateQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Appends an update. Never blocks and never fails while a handle exists.
    pub(crate) fn push(&self, update: T) {
        // Counted before sending so a fast receiver never takes the count below zero.
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(update).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Waits for the next update.
    ///
    /// Every handle owns a sender, so the channel never closes while `self` exists and this only
    /// resolves with `Some`. Concurrent callers are served one at a time.
    pub async fn recv(&self) -> Option<T> {
        let update = self.rx.lock().await.recv().await;
        self.taken(&update);
        update
    }

    /// Returns the next update if one is queued.
    ///
    /// Returns `None` while another task is parked in [`UpdateQueue::recv`], even if updates are
    /// queued; [`UpdateQueue::len`] still counts them.
    pub fn try_recv(&self) -> Option<T> {
        let mut rx = self.rx.try_lock().ok()?;
        let update = rx.try_recv().ok();
        self.taken(&update);
        update
    }

    fn taken(&self, update: &Option<T>) {
        if update.is_some() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Drains everything currently queued, in order.
    pub fn drain_ready(&self) -> Vec<T> {
        let mut updates = Vec::new();
        while let Some(update) = self.try_recv() {
            updates.push(update);
        }
        updates
    }

    /// Number of updates pushed and not yet received.
    pub fn len(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
