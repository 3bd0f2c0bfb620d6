//! Feed entry: one newly observed token listing.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// A single token listing observed on the upstream feed.
///
/// `mint` is the identity of the listing. Two entries with the same mint
/// are the same logical item, regardless of the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Display name of the token.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Location of the token metadata (opaque).
    pub uri: String,
    /// Mint address. Never empty.
    pub mint: String,
}

impl Entry {
    /// Create a new entry, rejecting an empty mint.
    pub fn try_new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        uri: impl Into<String>,
        mint: impl Into<String>,
    ) -> Result<Self> {
        let entry = Self {
            name: name.into(),
            symbol: symbol.into(),
            uri: uri.into(),
            mint: mint.into(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the entry invariants.
    pub fn validate(&self) -> Result<()> {
        if self.mint.trim().is_empty() {
            return Err(CoreError::InvalidEntry(format!(
                "empty mint for {} ({})",
                self.name, self.symbol
            )));
        }
        Ok(())
    }

    /// Check whether two entries refer to the same listing.
    pub fn same_listing(&self, other: &Entry) -> bool {
        self.mint == other.mint
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | {} ({})", self.name, self.symbol, self.mint)
    }
}
