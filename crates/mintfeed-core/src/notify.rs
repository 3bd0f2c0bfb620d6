//! Bounded fan-out of updates to independent subscribers.
//!
//! Publishing never blocks: every subscriber owns a bounded queue, and a
//! subscriber that falls behind loses its oldest pending updates instead of
//! stalling the producer. Dropping a `Subscription` (or a `CallbackHandle`)
//! unregisters it.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Producer side of an update stream.
#[derive(Debug, Clone)]
pub struct Notifier<T> {
    stream: &'static str,
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Notifier<T> {
    /// Create a notifier whose subscribers each buffer up to `capacity` updates.
    pub fn new(stream: &'static str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { stream, tx }
    }

    /// Publish an update to all current subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, value: T) -> usize {
        match self.tx.send(value) {
            Ok(n) => {
                trace!(stream = self.stream, receivers = n, "Update published");
                n
            }
            // No subscribers is the normal idle case.
            Err(_) => 0,
        }
    }

    /// Register a pull-style subscriber.
    ///
    /// Only updates published after this call are delivered.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            stream: self.stream,
            rx: self.tx.subscribe(),
            lagged: 0,
        }
    }

    /// Register a callback invoked once per update, in publish order.
    ///
    /// The callback runs on a dedicated Tokio task, so this must be called
    /// from within a runtime. Dropping the returned handle stops delivery.
    pub fn subscribe_fn<F>(&self, mut callback: F) -> CallbackHandle
    where
        F: FnMut(T) + Send + 'static,
    {
        let mut subscription = self.subscribe();
        let task = tokio::spawn(async move {
            while let Some(value) = subscription.recv().await {
                callback(value);
            }
        });
        CallbackHandle { task }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Name of the stream, used in logs.
    pub fn stream(&self) -> &'static str {
        self.stream
    }
}

/// Consumer side of an update stream.
#[derive(Debug)]
pub struct Subscription<T> {
    stream: &'static str,
    rx: broadcast::Receiver<T>,
    lagged: u64,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next update.
    ///
    /// Returns `None` once the producer is gone. Updates dropped because this
    /// subscriber fell behind are skipped and counted in `lagged()`.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next update if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every queued update.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Total updates dropped for this subscriber.
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    fn record_lag(&mut self, skipped: u64) {
        self.lagged += skipped;
        warn!(
            stream = self.stream,
            skipped,
            total = self.lagged,
            "Subscriber lagged, oldest updates dropped"
        );
    }
}

/// Registration token for a callback subscriber.
///
/// Delivery stops when the handle is dropped. Dropping it from inside the
/// callback itself is allowed.
#[derive(Debug)]
pub struct CallbackHandle {
    task: JoinHandle<()>,
}

impl CallbackHandle {
    /// Stop delivery now.
    pub fn unsubscribe(self) {}

    /// Check whether the delivery task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
