//! Decoding, ordered storage and subscription for the mintfeed listing feed.
//!
//! Turns raw upstream frames into `Entry` values, keeps them in a
//! newest-first, deduplicated, capacity-bounded `FeedStore`, and wires the
//! store to the connection manager through `FeedClient`.

pub mod client;
pub mod decoder;
pub mod error;
pub mod store;

pub use client::{FeedClient, FeedClientConfig, Ingestor};
pub use decoder::{decode_entry, DecodeStats, EntryDecoder};
pub use error::{FeedError, FeedResult};
pub use store::{FeedReader, FeedSnapshot, FeedStore, FeedUpdate, InsertOutcome, StoreConfig};
