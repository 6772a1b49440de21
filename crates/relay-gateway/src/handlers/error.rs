//! Handler error types

use relay_core::CoordinatorError;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Invalid payload received
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Operation requires an identified connection
    #[error("Not identified")]
    NotIdentified,

    /// Coordinator error (validation, persistence, routing)
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

impl HandlerError {
    /// Stable reason code reported back to the client. A handler error
    /// never closes the connection; the client just learns the send
    /// failed.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "INVALID_ARGUMENT",
            Self::NotIdentified => "UNAUTHORIZED",
            Self::Coordinator(e) => e.code(),
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
