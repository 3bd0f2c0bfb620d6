//! mintfeed - live token-listing feed.
//!
//! Orchestrates the components:
//! - WebSocket connection to the listing feed
//! - Frame decoding into the ordered, deduplicated feed store
//! - Connection status and new-entry logging
//! - Optional read-only dashboard

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
