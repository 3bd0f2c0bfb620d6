//! Observable connection state.

use mintfeed_core::{CallbackHandle, ConnectionState, Notifier, Subscription};
use mintfeed_telemetry::Metrics;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Default per-subscriber queue length for state transitions.
pub const DEFAULT_STATUS_BUFFER: usize = 64;

/// Holds the current `ConnectionState` and notifies subscribers of every
/// transition, in order.
///
/// Clones share the same state. Only the connection manager can change it.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    current: Arc<RwLock<ConnectionState>>,
    notifier: Notifier<ConnectionState>,
}

impl StatusPublisher {
    /// Create a publisher in the `Closed` state.
    pub fn new(buffer: usize) -> Self {
        Self {
            current: Arc::new(RwLock::new(ConnectionState::Closed)),
            notifier: Notifier::new("status", buffer),
        }
    }

    /// Current state.
    pub fn current(&self) -> ConnectionState {
        *self.current.read()
    }

    /// Subscribe to future transitions.
    pub fn subscribe(&self) -> Subscription<ConnectionState> {
        self.notifier.subscribe()
    }

    /// Register a callback for future transitions.
    pub fn subscribe_fn<F>(&self, callback: F) -> CallbackHandle
    where
        F: FnMut(ConnectionState) + Send + 'static,
    {
        self.notifier.subscribe_fn(callback)
    }

    /// Move to `next`, publishing exactly once.
    ///
    /// Setting the current state again is not a transition and publishes
    /// nothing. Returns whether a transition happened.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        let mut current = self.current.write();
        if *current == next {
            return false;
        }
        let previous = std::mem::replace(&mut *current, next);
        // Published under the lock so subscribers see transitions in order.
        self.notifier.publish(next);
        Metrics::ws_state_set(next.as_str());
        info!(from = %previous, to = %next, "Connection state changed");
        true
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_BUFFER)
    }
}
