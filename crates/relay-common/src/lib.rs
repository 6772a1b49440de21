//! # relay-common
//!
//! Shared utilities: environment-based configuration, application
//! errors, and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, Environment, GatewayConfig};
pub use error::{AppError, AppResult};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig};
