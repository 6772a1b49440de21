//! Conversation entity

use chrono::{DateTime, Utc};

use crate::ids::{ConversationId, UserId};

/// Conversation entity
///
/// Owned by the `ConversationStore`. The coordinator only touches the
/// `last_message_id` back-reference after a successful persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<UserId>,
    pub last_message_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new Conversation with no messages yet
    pub fn new(id: ConversationId, participants: Vec<UserId>) -> Self {
        Self {
            id,
            participants,
            last_message_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Check if a user participates in this conversation
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }

    /// Record the newest message reference
    pub fn set_last_message(&mut self, message_id: impl Into<String>) {
        self.last_message_id = Some(message_id.into());
        self.updated_at = Utc::now();
    }
}
