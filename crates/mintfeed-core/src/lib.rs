//! Core domain types for the mintfeed live listing feed.
//!
//! This crate provides the types shared by every other crate:
//! - `Entry`: one observed token listing, keyed by its mint address
//! - `ConnectionState`: lifecycle of the upstream connection
//! - `Notifier` / `Subscription`: bounded fan-out to independent consumers

pub mod entry;
pub mod error;
pub mod notify;
pub mod state;

pub use entry::Entry;
pub use error::{CoreError, Result};
pub use notify::{CallbackHandle, Notifier, Subscription};
pub use state::ConnectionState;
