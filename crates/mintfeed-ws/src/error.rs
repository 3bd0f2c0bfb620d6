//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    /// The endpoint cannot be used. Reported to the caller of `start`, never retried.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connection manager already started")]
    AlreadyStarted,

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Heartbeat timeout")]
    HeartbeatTimeout,

    /// The socket ended without a close frame.
    #[error("Stream ended without close frame")]
    StreamEnded,

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

impl WsError {
    /// Whether this is a configuration problem rather than a transport one.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidEndpoint(_) | Self::AlreadyStarted)
    }

    /// Stable label for the reconnect metric.
    pub fn reason_label(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint(_) | Self::AlreadyStarted => "configuration",
            Self::ConnectionClosed { .. } => "closed",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::StreamEnded => "stream_ended",
            Self::Tungstenite(_) => "transport",
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;
