//! mintfeed-dashboard - Read-only HTTP boundary for the listing feed.
//!
//! Exposes the feed and connection state to external consumers:
//!
//! - `GET /health`        → liveness check
//! - `GET /api/status`    → current connection state and feed size
//! - `GET /api/snapshot`  → feed entries, newest first
//! - `GET /metrics`       → Prometheus text exposition
//!
//! # Usage
//!
//! ```ignore
//! use mintfeed_dashboard::{run_server, DashboardConfig, DashboardState};
//!
//! let state = DashboardState::new(client.reader(), client.status());
//! let shutdown = CancellationToken::new();
//! tokio::spawn(run_server(state, DashboardConfig::default(), shutdown.clone()));
//! ```

mod config;
mod error;
mod server;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::{create_router, run_server, DashboardState, StatusResponse};
