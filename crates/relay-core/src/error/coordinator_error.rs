//! Coordinator errors
//!
//! The full taxonomy for everything the coordinator can reject or
//! surface. External-store failures are translated into one of these at
//! the dispatcher boundary; nothing below this type escapes a handler.

use thiserror::Error;

use crate::ids::UserId;

/// Coordinator error taxonomy
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Malformed or missing required field. Rejected immediately, no
    /// side effects.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Identity required but the connection has not announced one. The
    /// specific action is rejected; the connection stays alive.
    #[error("Not identified: {0}")]
    Unauthorized(String),

    /// A store call failed. A message send aborts and nothing is
    /// broadcast.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// The private-message recipient has no live connection. An
    /// expected outcome surfaced to the sender, not a failure.
    #[error("Recipient offline: {0}")]
    RecipientOffline(UserId),

    /// User lookup returned nothing (display-name enrichment path)
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Get an error code string for wire payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::RecipientOffline(_) => "RECIPIENT_OFFLINE",
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a validation error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this is an expected outcome rather than a fault.
    /// Expected outcomes are reported to the sender but never logged as
    /// errors.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::RecipientOffline(_))
    }

    /// Shorthand for invalid-argument construction
    pub fn invalid(field: &str) -> Self {
        Self::InvalidArgument(format!("missing or empty field: {field}"))
    }
}
