//! Feed client: one connection manager wired to one feed store.
//!
//! Frames flow `ConnectionManager` → `Ingestor` → `EntryDecoder` →
//! `FeedStore` on the connection worker task, so inserts happen in arrival
//! order with a single writer.

use crate::decoder::{DecodeStats, EntryDecoder};
use crate::error::FeedResult;
use crate::store::{FeedReader, FeedSnapshot, FeedStore, FeedUpdate, InsertOutcome, StoreConfig};
use mintfeed_core::{CallbackHandle, ConnectionState, Entry, Subscription};
use mintfeed_ws::status::DEFAULT_STATUS_BUFFER;
use mintfeed_ws::{ConnectionConfig, ConnectionManager, FrameSink, StatusPublisher};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decodes raw frames and inserts the valid ones into a store.
#[derive(Debug)]
pub struct Ingestor {
    decoder: EntryDecoder,
    store: FeedStore,
}

impl Ingestor {
    pub fn new(store: FeedStore) -> Self {
        Self {
            decoder: EntryDecoder::new(),
            store,
        }
    }

    /// Decode and insert one frame. Rejected frames are logged and dropped.
    pub fn ingest(&self, frame: &[u8]) -> Option<InsertOutcome> {
        match self.decoder.decode(frame) {
            Ok(entry) => {
                let mint = entry.mint.clone();
                let outcome = self.store.insert(entry);
                debug!(%mint, ?outcome, "Frame ingested");
                Some(outcome)
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), len = frame.len(), "Frame rejected");
                None
            }
        }
    }

    pub fn stats(&self) -> &DecodeStats {
        self.decoder.stats()
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }
}

impl FrameSink for Ingestor {
    fn on_frame(&self, frame: &[u8]) {
        self.ingest(frame);
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    pub connection: ConnectionConfig,
    pub store: StoreConfig,
    /// Transitions buffered per status subscriber.
    pub status_buffer: usize,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            store: StoreConfig::default(),
            status_buffer: DEFAULT_STATUS_BUFFER,
        }
    }
}

/// Live token-listing feed.
pub struct FeedClient {
    store: FeedStore,
    ingestor: Arc<Ingestor>,
    manager: ConnectionManager,
}

impl FeedClient {
    /// Create a client with an empty store.
    pub fn new(config: FeedClientConfig) -> Self {
        let store = FeedStore::new(config.store.clone());
        Self::with_store(config, store)
    }

    /// Create a client around an existing store (for example one holding seed entries).
    pub fn with_store(config: FeedClientConfig, store: FeedStore) -> Self {
        let ingestor = Arc::new(Ingestor::new(store.clone()));
        let status = StatusPublisher::new(config.status_buffer);
        let manager = ConnectionManager::new(config.connection, status, ingestor.clone());
        Self {
            store,
            ingestor,
            manager,
        }
    }

    /// Connect to `endpoint` and keep the feed live until `stop`.
    pub fn start(&self, endpoint: &str) -> FeedResult<()> {
        self.manager.start(endpoint)?;
        Ok(())
    }

    /// Close the connection. Idempotent.
    pub async fn stop(&self) {
        self.manager.stop().await;
    }

    /// Insert an entry directly, bypassing the connection.
    pub fn insert(&self, entry: Entry) -> InsertOutcome {
        self.store.insert(entry)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe_entries(&self) -> Subscription<FeedUpdate> {
        self.store.subscribe()
    }

    pub fn subscribe_entries_fn<F>(&self, callback: F) -> CallbackHandle
    where
        F: FnMut(FeedUpdate) + Send + 'static,
    {
        self.store.subscribe_fn(callback)
    }

    pub fn subscribe_status(&self) -> Subscription<ConnectionState> {
        self.manager.status().subscribe()
    }

    pub fn subscribe_status_fn<F>(&self, callback: F) -> CallbackHandle
    where
        F: FnMut(ConnectionState) + Send + 'static,
    {
        self.manager.status().subscribe_fn(callback)
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn status(&self) -> StatusPublisher {
        self.manager.status().clone()
    }

    pub fn reader(&self) -> FeedReader {
        self.store.reader()
    }

    pub fn decode_stats(&self) -> &DecodeStats {
        self.ingestor.stats()
    }

    pub fn reconnect_count(&self) -> u32 {
        self.manager.reconnect_count()
    }

    pub fn is_running(&self) -> bool {
        self.manager.is_running()
    }
}
