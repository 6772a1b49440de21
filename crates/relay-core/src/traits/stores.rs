//! Store traits (ports) - the coordinator's view of durable state
//!
//! The coordinator never talks to a database directly. These traits are
//! the defined interfaces behind which credential storage, message
//! persistence, and conversation CRUD live. The domain layer defines
//! what it needs; external infrastructure provides it.

use async_trait::async_trait;

use crate::entities::Message;
use crate::error::CoordinatorError;
use crate::ids::{ConversationId, UserId};

/// Result type for store operations
pub type StoreResult<T> = Result<T, CoordinatorError>;

/// User lookups and best-effort presence flags.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Resolve a user's display name.
    ///
    /// Expected to enforce its own timeout; the registry treats any
    /// failure as "Unknown" and never blocks on it indefinitely.
    async fn display_name(&self, user_id: &UserId) -> StoreResult<String>;

    /// Record the user's online flag. Best-effort: callers log and
    /// swallow failures.
    async fn set_online_status(&self, user_id: &UserId, online: bool) -> StoreResult<()>;
}

/// Message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message with status `sent` and return the stored
    /// record (id and timestamp assigned by the store).
    async fn create(
        &self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        text: &str,
    ) -> StoreResult<Message>;
}

/// Conversation metadata owned by the external CRUD layer.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Point the conversation's `last_message` back-reference at a
    /// freshly persisted message.
    async fn update_last_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &str,
    ) -> StoreResult<()>;
}
