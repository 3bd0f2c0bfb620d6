//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] mintfeed_feed::FeedError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] mintfeed_dashboard::DashboardError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] mintfeed_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
