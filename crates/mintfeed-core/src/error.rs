//! Error types for mintfeed-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
