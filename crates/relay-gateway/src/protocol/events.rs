//! Client and server event definitions
//!
//! All frames are JSON objects of the form `{"event": ..., "data": ...}`.

use relay_core::{
    ConversationId, MessageView, PresenceEntry, PrivateMessageView, TypingView, UserId,
};
use serde::{Deserialize, Serialize};

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to a user identity after the transport has
    /// been accepted.
    Identify {
        user_id: UserId,
        #[serde(default)]
        display_name: Option<String>,
    },
    /// Subscribe this connection to a conversation's broadcasts.
    JoinRoom { conversation_id: ConversationId },
    /// Persist a message, then fan it out to the room.
    SendMessage {
        conversation_id: ConversationId,
        text: String,
    },
    /// Start or stop the typing indicator for a conversation.
    Typing {
        conversation_id: ConversationId,
        is_typing: bool,
    },
    /// Direct payload to every live connection of one user.
    PrivateMessage { to_user_id: UserId, body: String },
}

impl ClientEvent {
    /// Deserialize from a JSON frame
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Event name as it appears on the wire
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identify { .. } => "identify",
            Self::JoinRoom { .. } => "join_room",
            Self::SendMessage { .. } => "send_message",
            Self::Typing { .. } => "typing",
            Self::PrivateMessage { .. } => "private_message",
        }
    }
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full list of online users. Emitted on any registry change.
    PresenceSnapshot { users: Vec<PresenceEntry> },
    /// A persisted message, fanned out to its conversation's room.
    RoomMessage(MessageView),
    /// Current typing set of one conversation.
    TypingSnapshot(TypingView),
    /// Direct payload delivered to a recipient's connections.
    PrivateMessage(PrivateMessageView),
    /// Sender-only acknowledgement for a private message that could not
    /// be delivered anywhere.
    PrivateMessageAck {
        to_user_id: UserId,
        delivered: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// A send was rejected (validation or persistence failure).
    SendFailed { reason: String },
}

impl ServerEvent {
    /// Serialize to a JSON frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Event name as it appears on the wire
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PresenceSnapshot { .. } => "presence_snapshot",
            Self::RoomMessage(_) => "room_message",
            Self::TypingSnapshot(_) => "typing_snapshot",
            Self::PrivateMessage(_) => "private_message",
            Self::PrivateMessageAck { .. } => "private_message_ack",
            Self::SendFailed { .. } => "send_failed",
        }
    }
}
