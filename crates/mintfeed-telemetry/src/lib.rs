//! Prometheus metrics and structured logging for mintfeed.
//!
//! - Prometheus metrics for connection state, reconnects, decode errors and
//!   feed size
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
