//! # relay-core
//!
//! Domain layer for the messaging coordinator: identifiers, entities,
//! store traits, and the error taxonomy. This crate has zero dependencies
//! on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod ids;
pub mod traits;

// Re-export commonly used types at crate root
pub use entities::{
    Conversation, Message, MessageStatus, MessageView, PresenceEntry, PrivateMessageView,
    TypingView,
};
pub use error::CoordinatorError;
pub use ids::{ConnectionId, ConversationId, UserId};
pub use traits::{ConversationStore, MessageStore, StoreResult, UserStore};
