//! Upstream connection lifecycle state.

use serde::{Deserialize, Serialize};

/// Connection state of the upstream feed.
///
/// Exactly one value holds at any time. Only the connection manager moves
/// between states; everything else observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    Connecting,
    /// The transport is open and frames are flowing.
    Open,
    /// The last attempt or the live connection failed.
    Error,
    /// Closed by the peer, or stopped by the owner.
    Closed,
}

impl ConnectionState {
    /// All states, in declaration order.
    pub const ALL: [ConnectionState; 4] = [
        ConnectionState::Connecting,
        ConnectionState::Open,
        ConnectionState::Error,
        ConnectionState::Closed,
    ];

    /// Lowercase label, used for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Error => "error",
            Self::Closed => "closed",
        }
    }

    /// Check if frames can currently be received.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
