//! Connection handling
//!
//! Individual connection handles and the registry mapping users to
//! their live connections.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionPhase, Identity};
pub use registry::ConnectionRegistry;
