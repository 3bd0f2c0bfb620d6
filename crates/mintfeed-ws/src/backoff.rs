//! Reconnect backoff policy.
//!
//! Exponential backoff with jitter: the nominal delay starts at
//! `initial_delay_ms`, grows by `multiplier` after every failed attempt and
//! is capped at `max_delay_ms`. Jitter shortens each delay by a random
//! fraction of up to `jitter` so that many clients do not reconnect in
//! lockstep. A successful open resets the policy.

use rand::Rng;
use std::time::Duration;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first reconnect attempt.
    pub initial_delay_ms: u64,
    /// Growth factor applied after each attempt (>= 1.0).
    pub multiplier: f64,
    /// Upper bound for the nominal delay.
    pub max_delay_ms: u64,
    /// Maximum fraction removed from a delay at random (0.0 - 1.0).
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: 0.2,
        }
    }
}

/// Stateful backoff sequence for one connection manager.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current_ms: u64,
    attempts: u32,
}

impl Backoff {
    /// Create a new backoff at its initial delay.
    pub fn new(config: BackoffConfig) -> Self {
        let max_delay_ms = config.max_delay_ms.max(1);
        let config = BackoffConfig {
            initial_delay_ms: config.initial_delay_ms.min(max_delay_ms),
            multiplier: config.multiplier.max(1.0),
            max_delay_ms,
            // NaN disables jitter.
            jitter: if config.jitter.is_nan() {
                0.0
            } else {
                config.jitter.clamp(0.0, 1.0)
            },
        };
        Self {
            current_ms: config.initial_delay_ms,
            config,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt, advancing the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let nominal = self.current_ms;
        self.attempts = self.attempts.saturating_add(1);

        let grown = (self.current_ms as f64 * self.config.multiplier).round() as u64;
        self.current_ms = grown.clamp(self.config.initial_delay_ms, self.config.max_delay_ms);

        Duration::from_millis(self.apply_jitter(nominal))
    }

    /// Nominal delay the next call to `next_delay` is based on.
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// Attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Return to the initial delay (after a successful open).
    pub fn reset(&mut self) {
        self.current_ms = self.config.initial_delay_ms;
        self.attempts = 0;
    }

    fn apply_jitter(&self, nominal_ms: u64) -> u64 {
        if self.config.jitter <= 0.0 || nominal_ms == 0 {
            return nominal_ms;
        }
        let fraction = rand::thread_rng().gen_range(0.0..=self.config.jitter);
        let reduction = (nominal_ms as f64 * fraction) as u64;
        nominal_ms.saturating_sub(reduction)
    }
}
