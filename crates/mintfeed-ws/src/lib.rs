//! Upstream WebSocket connection for the mintfeed listing feed.
//!
//! Provides a receive-only WebSocket client with:
//! - Endpoint validation (configuration errors are never retried)
//! - Automatic reconnection with exponential backoff and jitter
//! - Heartbeat monitoring (idle ping, pong timeout detection)
//! - An observable connection state (`StatusPublisher`)
//! - Frame delivery through the `FrameSink` seam

pub mod backoff;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod heartbeat;
pub mod sink;
pub mod status;

pub use backoff::{Backoff, BackoffConfig};
pub use connection::{ConnectionConfig, ConnectionManager};
pub use endpoint::parse_endpoint;
pub use error::{WsError, WsResult};
pub use sink::FrameSink;
pub use status::StatusPublisher;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
