//! Integration tests for mintfeed.
//!
//! These tests verify the interaction between components:
//! - Connection lifecycle and reconnection against a live socket
//! - Frame decoding into the ordered feed
//! - Application startup and shutdown

pub mod common;
