//! Frame decoding and validation.
//!
//! Each upstream frame carries one JSON object:
//! `{"name": "...", "symbol": "...", "uri": "...", "mint": "..."}`.
//! All four fields must be strings and `mint` must not be empty. Extra
//! fields are ignored. A frame that fails validation is rejected on its own;
//! it never affects the connection or the frames around it.

use crate::error::{FeedError, FeedResult};
use mintfeed_core::Entry;
use mintfeed_telemetry::Metrics;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for decoded frames.
#[derive(Debug, Default)]
pub struct DecodeStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl DecodeStats {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Decoder with acceptance statistics.
#[derive(Debug, Default)]
pub struct EntryDecoder {
    stats: DecodeStats,
}

impl EntryDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get decode statistics.
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Decode one frame, recording the outcome.
    pub fn decode(&self, frame: &[u8]) -> FeedResult<Entry> {
        let result = decode_entry(frame);
        match &result {
            Ok(_) => self.stats.record_accepted(),
            Err(e) => {
                self.stats.record_rejected();
                Metrics::decode_error(e.kind());
            }
        }
        result
    }
}

/// Decode one frame into an `Entry`.
pub fn decode_entry(frame: &[u8]) -> FeedResult<Entry> {
    let text = std::str::from_utf8(frame).map_err(|e| FeedError::InvalidUtf8(e.to_string()))?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| FeedError::InvalidJson(e.to_string()))?;

    let object = match &value {
        Value::Object(object) => object,
        other => return Err(FeedError::NotAnObject(type_name(other))),
    };

    let name = string_field(object, "name")?;
    let symbol = string_field(object, "symbol")?;
    let uri = string_field(object, "uri")?;
    let mint = string_field(object, "mint")?;

    if mint.trim().is_empty() {
        return Err(FeedError::EmptyMint);
    }

    Ok(Entry {
        name: name.to_string(),
        symbol: symbol.to_string(),
        uri: uri.to_string(),
        mint: mint.to_string(),
    })
}

fn string_field<'a>(object: &'a Map<String, Value>, field: &'static str) -> FeedResult<&'a str> {
    match object.get(field) {
        None => Err(FeedError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(FeedError::WrongType {
            field,
            found: type_name(other),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
