//! Prometheus metrics for mintfeed.
//!
//! Covers:
//! - Upstream connection state and reconnects
//! - Entry acceptance, duplicates and capacity eviction
//! - Decode failures by kind
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a programming error that should crash at
//! startup. These panics only occur during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_counter,
    register_int_gauge, CounterVec, Encoder, Gauge, GaugeVec, IntCounter, IntGauge, TextEncoder,
};

/// Connection state labels, mirrored from `ConnectionState::as_str`.
const WS_STATES: [&str; 4] = ["connecting", "open", "error", "closed"];

/// Upstream connection open (1) or not (0).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "mintfeed_ws_connected",
        "Upstream WebSocket connection open (1=open)"
    )
    .unwrap()
});

/// Connection state machine current state.
/// Labels: state (connecting/open/error/closed)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "mintfeed_ws_state",
        "Connection state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Reconnects scheduled, by what ended the previous connection.
/// Labels: reason (closed/transport/heartbeat_timeout)
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mintfeed_ws_reconnect_total",
        "Total reconnects scheduled",
        &["reason"]
    )
    .unwrap()
});

/// Entries offered to the store.
/// Labels: outcome (accepted/duplicate)
pub static ENTRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mintfeed_entries_total",
        "Total entries offered to the feed store",
        &["outcome"]
    )
    .unwrap()
});

/// Frames dropped by the decoder.
/// Labels: kind (invalid_utf8/invalid_json/not_an_object/missing_field/wrong_type/empty_mint)
pub static DECODE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mintfeed_decode_errors_total",
        "Total inbound frames rejected by the decoder",
        &["kind"]
    )
    .unwrap()
});

/// Entries evicted by the capacity bound.
pub static ENTRIES_EVICTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mintfeed_entries_evicted_total",
        "Total entries evicted by the feed capacity bound"
    )
    .unwrap()
});

/// Current number of entries held by the store.
pub static FEED_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("mintfeed_feed_size", "Current number of entries in the feed").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the connection state gauge.
    /// Only the active state is 1, all others 0.
    pub fn ws_state_set(state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
        WS_CONNECTED.set(if state == "open" { 1.0 } else { 0.0 });
    }

    /// Record a scheduled reconnect.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an entry accepted into the store.
    pub fn entry_accepted() {
        ENTRIES_TOTAL.with_label_values(&["accepted"]).inc();
    }

    /// Record an entry ignored as a duplicate mint.
    pub fn entry_duplicate() {
        ENTRIES_TOTAL.with_label_values(&["duplicate"]).inc();
    }

    /// Record a rejected frame.
    pub fn decode_error(kind: &str) {
        DECODE_ERRORS_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record evicted entries.
    pub fn entries_evicted(count: usize) {
        ENTRIES_EVICTED_TOTAL.inc_by(count as u64);
    }

    /// Set the current feed size.
    pub fn feed_size(len: usize) {
        FEED_SIZE.set(len as i64);
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
