//! Broadcast views
//!
//! Serializable payloads fanned out to connected clients. Views are
//! derived at dispatch time; none of them is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Message, MessageStatus};
use crate::ids::{ConversationId, UserId};

/// One entry in the presence snapshot: an online user and how many
/// live connections back that online state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub connection_count: usize,
}

/// A persisted message as broadcast to room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    /// Build a view from a persisted message plus best-effort sender metadata
    pub fn from_message(message: Message, sender_name: String) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            sender_name,
            text: message.text,
            status: message.status,
            created_at: message.created_at,
        }
    }
}

/// The typing set of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingView {
    pub conversation_id: ConversationId,
    pub usernames: Vec<String>,
}

/// A direct user-to-user payload. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessageView {
    pub body: String,
    pub from_user_id: UserId,
    pub from_display_name: String,
    pub timestamp: DateTime<Utc>,
}
