//! Heartbeat tracking for the upstream connection.
//!
//! The feed is receive-only, so silence can mean either a quiet market or a
//! dead socket. After `interval_ms` without inbound traffic a WebSocket ping
//! is sent; if nothing arrives within `timeout_ms` of that ping the
//! connection is considered dead.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Heartbeat state for one live connection.
#[derive(Debug)]
pub struct Heartbeat {
    /// Idle time before a ping is sent.
    interval_ms: u64,
    /// How long to wait for traffic after a ping.
    timeout_ms: u64,
    /// Last ping sent.
    last_ping: Option<DateTime<Utc>>,
    /// Last inbound frame of any kind.
    last_inbound: DateTime<Utc>,
    /// Whether a ping is outstanding.
    waiting_for_pong: bool,
}

impl Heartbeat {
    /// Create a new heartbeat tracker.
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            timeout_ms: timeout_ms.max(1),
            last_ping: None,
            last_inbound: Utc::now(),
            waiting_for_pong: false,
        }
    }

    /// Reset state (called on every new connection).
    pub fn reset(&mut self) {
        self.last_ping = None;
        self.last_inbound = Utc::now();
        self.waiting_for_pong = false;
    }

    /// Record that a ping was sent.
    pub fn record_ping(&mut self) {
        let now = Utc::now();
        self.last_ping = Some(now);
        self.waiting_for_pong = true;
        debug!(time = %now, "Sent heartbeat ping");
    }

    /// Record a pong.
    pub fn record_pong(&mut self) {
        let now = Utc::now();
        if let Some(ping_time) = self.last_ping {
            let rtt_ms = (now - ping_time).num_milliseconds();
            debug!(rtt_ms, "Received pong");
        }
        self.record_inbound_at(now);
    }

    /// Record any inbound frame. Traffic proves liveness as well as a pong.
    pub fn record_inbound(&mut self) {
        self.record_inbound_at(Utc::now());
    }

    fn record_inbound_at(&mut self, now: DateTime<Utc>) {
        self.last_inbound = now;
        self.waiting_for_pong = false;
    }

    /// Whether an outstanding ping went unanswered for too long.
    pub fn is_timed_out(&self) -> bool {
        if !self.waiting_for_pong {
            return false;
        }
        self.last_ping
            .map(|ping| (Utc::now() - ping).num_milliseconds() > self.timeout_ms as i64)
            .unwrap_or(false)
    }

    /// Milliseconds since the last inbound frame.
    pub fn idle_ms(&self) -> i64 {
        (Utc::now() - self.last_inbound).num_milliseconds()
    }

    /// Whether a ping should be sent now.
    pub fn should_send_ping(&self) -> bool {
        !self.waiting_for_pong && self.idle_ms() >= self.interval_ms as i64
    }

    /// How often the connection loop should evaluate the heartbeat.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis((self.interval_ms.min(self.timeout_ms) / 2).max(1))
    }

    pub fn is_waiting_for_pong(&self) -> bool {
        self.waiting_for_pong
    }
}
