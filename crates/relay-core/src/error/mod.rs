//! Error types for the coordinator

mod coordinator_error;

pub use coordinator_error::CoordinatorError;
