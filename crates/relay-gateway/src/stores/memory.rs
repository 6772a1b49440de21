//! In-memory store implementations
//!
//! DashMap-backed implementations of the store ports. Each store can be
//! armed to fail its next write, which is how the tests exercise the
//! fail-closed/fail-open paths of the dispatcher.

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{
    ConversationId, ConversationStore, CoordinatorError, Message, MessageStore, StoreResult,
    UserId, UserStore,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// In-memory user records: display name plus the best-effort online flag
pub struct InMemoryUserStore {
    names: DashMap<UserId, String>,
    online: DashMap<UserId, bool>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: DashMap::new(),
            online: DashMap::new(),
        }
    }

    /// Seed a user record
    pub fn insert(&self, user_id: UserId, display_name: &str) {
        self.names.insert(user_id, display_name.to_string());
    }

    /// Read back the last recorded online flag
    pub fn online_flag(&self, user_id: &UserId) -> Option<bool> {
        self.online.get(user_id).map(|r| *r)
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn display_name(&self, user_id: &UserId) -> StoreResult<String> {
        self.names
            .get(user_id)
            .map(|r| r.clone())
            .ok_or_else(|| CoordinatorError::UserNotFound(user_id.clone()))
    }

    async fn set_online_status(&self, user_id: &UserId, online: bool) -> StoreResult<()> {
        self.online.insert(user_id.clone(), online);
        Ok(())
    }
}

/// In-memory message persistence with sequential ids
pub struct InMemoryMessageStore {
    messages: DashMap<String, Message>,
    next_id: AtomicU64,
    fail_next: AtomicBool,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            next_id: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Arm the store to fail its next create
    pub fn fail_next_create(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of persisted messages
    pub fn count(&self) -> usize {
        self.messages.len()
    }

    /// All persisted messages of one conversation, oldest first
    pub fn history(&self, conversation_id: &ConversationId) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|r| r.conversation_id == *conversation_id)
            .map(|r| r.clone())
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        messages
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(
        &self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        text: &str,
    ) -> StoreResult<Message> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CoordinatorError::Persistence(
                "message store unavailable".to_string(),
            ));
        }

        let id = format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let message = Message::new(
            id.clone(),
            conversation_id.clone(),
            sender_id.clone(),
            text.to_string(),
        );
        self.messages.insert(id, message.clone());
        Ok(message)
    }
}

/// In-memory conversation metadata
pub struct InMemoryConversationStore {
    last_messages: DashMap<ConversationId, String>,
    fail_next: AtomicBool,
}

impl InMemoryConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_messages: DashMap::new(),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Arm the store to fail its next update
    pub fn fail_next_update(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Read back a conversation's last-message reference
    pub fn last_message(&self, conversation_id: &ConversationId) -> Option<String> {
        self.last_messages.get(conversation_id).map(|r| r.clone())
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn update_last_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &str,
    ) -> StoreResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CoordinatorError::Persistence(
                "conversation store unavailable".to_string(),
            ));
        }

        self.last_messages
            .insert(conversation_id.clone(), message_id.to_string());
        Ok(())
    }
}
