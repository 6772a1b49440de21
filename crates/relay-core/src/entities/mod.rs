//! Entities - persisted records and the views broadcast over the wire

mod conversation;
mod message;
mod views;

pub use conversation::Conversation;
pub use message::{Message, MessageStatus};
pub use views::{MessageView, PresenceEntry, PrivateMessageView, TypingView};
