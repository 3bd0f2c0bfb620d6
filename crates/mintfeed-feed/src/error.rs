//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Frame is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Wrong type for field {field}: expected string, got {found}")]
    WrongType {
        field: &'static str,
        found: &'static str,
    },

    #[error("Empty mint")]
    EmptyMint,

    #[error("Connection error: {0}")]
    Connection(#[from] mintfeed_ws::WsError),
}

impl FeedError {
    /// Stable label for the decode error metric.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUtf8(_) => "invalid_utf8",
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnObject(_) => "not_an_object",
            Self::MissingField(_) => "missing_field",
            Self::WrongType { .. } => "wrong_type",
            Self::EmptyMint => "empty_mint",
            Self::Connection(_) => "connection",
        }
    }

    /// Whether this error came from a single bad frame.
    pub fn is_decode(&self) -> bool {
        !matches!(self, Self::Connection(_))
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
