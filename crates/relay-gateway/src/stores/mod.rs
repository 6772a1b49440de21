//! Store implementations
//!
//! The real stores live in the external CRUD layer; these in-memory
//! versions back the dev binary and the test suites.

mod memory;

pub use memory::{InMemoryConversationStore, InMemoryMessageStore, InMemoryUserStore};
