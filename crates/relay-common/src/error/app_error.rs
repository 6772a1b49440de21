//! Application error types
//!
//! Top-level failures of the server binary: configuration and server
//! startup. Per-connection and per-message failures stay inside the
//! gateway and never surface here.

use crate::config::ConfigError;
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to bind the listen address
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server runtime error
    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
