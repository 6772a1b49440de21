//! Message entity - represents a persisted chat message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, UserId};

/// Delivery status of a persisted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Saved, broadcast pending or complete
    Sent,
    /// Seen by at least one recipient device
    Delivered,
    /// Read by the recipient
    Read,
}

impl MessageStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message entity
///
/// Owned by the `MessageStore`; immutable once broadcast except for the
/// status field, which the external CRUD layer mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new Message with status `sent`
    pub fn new(
        id: impl Into<String>,
        conversation_id: ConversationId,
        sender_id: UserId,
        text: String,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id,
            sender_id,
            text,
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        }
    }

    /// Check if message content is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
