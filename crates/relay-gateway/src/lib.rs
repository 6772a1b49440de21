//! # relay-gateway
//!
//! The real-time messaging coordinator: connection registry, room
//! broker, typing tracker, message dispatcher, and the WebSocket
//! transport that feeds them.

pub mod connection;
pub mod dispatch;
pub mod handlers;
pub mod lifecycle;
pub mod protocol;
pub mod rooms;
pub mod server;
pub mod stores;
pub mod typing;

pub use server::run;
