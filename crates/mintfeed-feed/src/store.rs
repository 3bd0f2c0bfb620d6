//! Ordered, deduplicated, capacity-bounded feed store.
//!
//! Entries are kept newest-first in acceptance order. By default an entry
//! whose mint is already present is ignored and the original keeps its
//! position; with `allow_duplicates` every entry is prepended. When an
//! insert pushes the store past `max_entries`, the oldest entries are
//! evicted inside the same insert.
//!
//! There is a single writer (the connection worker through `Ingestor`).
//! Readers take cheap snapshots under a short read lock and never see a
//! half-applied insert.

use mintfeed_core::{CallbackHandle, Entry, Notifier, Subscription};
use mintfeed_telemetry::Metrics;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// Default capacity bound.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default per-subscriber queue length for entry updates.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of entries kept (at least 1).
    pub max_entries: usize,
    /// Prepend repeated mints instead of ignoring them.
    pub allow_duplicates: bool,
    /// Updates buffered per subscriber before the oldest are dropped.
    pub subscriber_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            allow_duplicates: false,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

/// Notification sent to subscribers after every accepted insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUpdate {
    /// The newly accepted entry, now first in the feed.
    pub entry: Entry,
    /// Entries evicted by this insert, oldest last.
    pub evicted: Vec<Entry>,
    /// Feed size after the insert.
    pub len: usize,
}

/// Result of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Entry prepended; `evicted` entries fell off the tail.
    Inserted { evicted: usize },
    /// Mint already present; nothing changed.
    Duplicate,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }
}

/// Read-only, newest-first view of the feed at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeedSnapshot {
    entries: Vec<Entry>,
}

impl FeedSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recently accepted entry.
    pub fn newest(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Mints in feed order.
    pub fn mints(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.mint.as_str()).collect()
    }

    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Entry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a FeedSnapshot {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Newest first.
    entries: VecDeque<Entry>,
    /// Occurrences per mint (more than one only with `allow_duplicates`).
    mints: HashMap<String, usize>,
}

impl StoreInner {
    fn remember(&mut self, mint: &str) {
        *self.mints.entry(mint.to_string()).or_insert(0) += 1;
    }

    fn forget(&mut self, mint: &str) {
        if let Some(count) = self.mints.get_mut(mint) {
            *count -= 1;
            if *count == 0 {
                self.mints.remove(mint);
            }
        }
    }
}

/// The feed store. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct FeedStore {
    inner: Arc<RwLock<StoreInner>>,
    config: StoreConfig,
    notifier: Notifier<FeedUpdate>,
}

impl FeedStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let config = StoreConfig {
            max_entries: config.max_entries.max(1),
            ..config
        };
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            notifier: Notifier::new("entries", config.subscriber_buffer),
            config,
        }
    }

    /// Store configuration in effect.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Insert an entry at the front of the feed.
    pub fn insert(&self, entry: Entry) -> InsertOutcome {
        let mut inner = self.inner.write();

        if !self.config.allow_duplicates && inner.mints.contains_key(&entry.mint) {
            trace!(mint = %entry.mint, "Duplicate mint ignored");
            Metrics::entry_duplicate();
            return InsertOutcome::Duplicate;
        }

        inner.remember(&entry.mint);
        inner.entries.push_front(entry.clone());

        let mut evicted = Vec::new();
        while inner.entries.len() > self.config.max_entries {
            let Some(oldest) = inner.entries.pop_back() else {
                break;
            };
            inner.forget(&oldest.mint);
            evicted.push(oldest);
        }

        let len = inner.entries.len();
        let evicted_count = evicted.len();

        Metrics::entry_accepted();
        Metrics::feed_size(len);
        if evicted_count > 0 {
            Metrics::entries_evicted(evicted_count);
            debug!(evicted = evicted_count, len, "Capacity eviction");
        }

        // Published under the write lock so subscribers see acceptance order.
        self.notifier.publish(FeedUpdate {
            entry,
            evicted,
            len,
        });

        InsertOutcome::Inserted {
            evicted: evicted_count,
        }
    }

    /// Current feed, newest first.
    pub fn snapshot(&self) -> FeedSnapshot {
        let inner = self.inner.read();
        FeedSnapshot {
            entries: inner.entries.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a mint is currently held.
    pub fn contains(&self, mint: &str) -> bool {
        self.inner.read().mints.contains_key(mint)
    }

    /// Subscribe to updates for future inserts.
    pub fn subscribe(&self) -> Subscription<FeedUpdate> {
        self.notifier.subscribe()
    }

    /// Register a callback for future inserts. Requires a Tokio runtime.
    pub fn subscribe_fn<F>(&self, callback: F) -> CallbackHandle
    where
        F: FnMut(FeedUpdate) + Send + 'static,
    {
        self.notifier.subscribe_fn(callback)
    }

    /// Read-only handle for consumers.
    pub fn reader(&self) -> FeedReader {
        FeedReader {
            store: self.clone(),
        }
    }
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Read-only access to a `FeedStore`: snapshots and subscriptions, no inserts.
#[derive(Debug, Clone)]
pub struct FeedReader {
    store: FeedStore,
}

impl FeedReader {
    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.store.contains(mint)
    }

    pub fn subscribe(&self) -> Subscription<FeedUpdate> {
        self.store.subscribe()
    }

    pub fn subscribe_fn<F>(&self, callback: F) -> CallbackHandle
    where
        F: FnMut(FeedUpdate) + Send + 'static,
    {
        self.store.subscribe_fn(callback)
    }
}
