//! Integration test utilities for the relay gateway
//!
//! This crate provides an in-process harness that wires the full
//! coordinator together over in-memory stores, with per-client event
//! receivers standing in for WebSocket transports.

pub mod helpers;

pub use helpers::*;
