//! Shared test helpers.

pub mod mock_ws;
