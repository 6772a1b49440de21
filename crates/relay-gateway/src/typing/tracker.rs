//! Typing tracker
//!
//! Per-conversation, per-username typing indicators with automatic
//! expiry. State is keyed by username, not connection, so a user typing
//! from one device does not lose the indicator when another device
//! disconnects. Nothing here is persisted.

use crate::protocol::ServerEvent;
use crate::rooms::RoomBroker;
use relay_core::{ConversationId, TypingView};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default lifetime of a typing entry without a refresh, matching the
/// client-side debounce.
pub const DEFAULT_TYPING_EXPIRY: Duration = Duration::from_secs(2);

type TypingKey = (ConversationId, String);

/// A scheduled expiry. The generation lets a stale timer that fires
/// while being replaced recognize it has lost the race.
struct ExpiryTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Tracks who is typing in which conversation
pub struct TypingTracker {
    broker: Arc<RoomBroker>,

    /// Lifetime of an entry without a refresh
    expiry: Duration,

    /// Conversation ID to typing usernames mapping
    typing: DashMap<ConversationId, HashSet<String>>,

    /// Pending expiry timers, cancel-and-replace on refresh
    timers: DashMap<TypingKey, ExpiryTimer>,

    /// Monotonic timer generation counter
    generation: AtomicU64,
}

impl TypingTracker {
    /// Create a new tracker with the default 2-second expiry
    #[must_use]
    pub fn new_shared(broker: Arc<RoomBroker>) -> Arc<Self> {
        Self::with_expiry(broker, DEFAULT_TYPING_EXPIRY)
    }

    /// Create a new tracker with a custom expiry duration
    #[must_use]
    pub fn with_expiry(broker: Arc<RoomBroker>, expiry: Duration) -> Arc<Self> {
        Arc::new(Self {
            broker,
            expiry,
            typing: DashMap::new(),
            timers: DashMap::new(),
            generation: AtomicU64::new(0),
        })
    }

    /// Record a typing start or stop and broadcast the conversation's
    /// updated typing set to its room.
    ///
    /// A start (re)arms the expiry timer for the (conversation,
    /// username) key; a stop removes the entry and cancels any pending
    /// timer immediately.
    pub fn set_typing(
        self: &Arc<Self>,
        conversation_id: ConversationId,
        username: String,
        is_typing: bool,
    ) {
        let key = (conversation_id.clone(), username.clone());

        if is_typing {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let tracker = Arc::clone(self);
            let expire_key = key.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(tracker.expiry).await;
                tracker.expire(&expire_key, generation);
            });

            if let Some(old) = self.timers.insert(key, ExpiryTimer { generation, handle }) {
                old.handle.abort();
            }

            // The entry goes in only after the timer map holds the new
            // generation. A replaced timer firing during the swap fails
            // its generation check and cannot clear a fresh entry.
            self.typing
                .entry(conversation_id.clone())
                .or_default()
                .insert(username.clone());

            tracing::trace!(
                conversation_id = %conversation_id,
                username = %username,
                "Typing started"
            );
        } else {
            self.remove_entry(&conversation_id, &username);
            if let Some((_, old)) = self.timers.remove(&key) {
                old.handle.abort();
            }

            tracing::trace!(
                conversation_id = %conversation_id,
                username = %username,
                "Typing stopped"
            );
        }

        self.broadcast_typing(&conversation_id);
    }

    /// Timer callback: behave as if a stop event arrived, unless a
    /// newer timer has replaced this one.
    fn expire(&self, key: &TypingKey, generation: u64) {
        let removed = self
            .timers
            .remove_if(key, |_, timer| timer.generation == generation)
            .is_some();

        if removed {
            let (conversation_id, username) = key;
            self.remove_entry(conversation_id, username);

            tracing::trace!(
                conversation_id = %conversation_id,
                username = %username,
                "Typing expired"
            );

            self.broadcast_typing(conversation_id);
        }
    }

    fn remove_entry(&self, conversation_id: &ConversationId, username: &str) {
        self.typing.alter(conversation_id, |_, mut usernames| {
            usernames.remove(username);
            usernames
        });
        self.typing.retain(|_, usernames| !usernames.is_empty());
    }

    fn broadcast_typing(&self, conversation_id: &ConversationId) {
        let view = TypingView {
            conversation_id: conversation_id.clone(),
            usernames: self.typing_users(conversation_id),
        };
        self.broker
            .broadcast(conversation_id, &ServerEvent::TypingSnapshot(view));
    }

    /// Get the current typing set of a conversation, sorted
    pub fn typing_users(&self, conversation_id: &ConversationId) -> Vec<String> {
        let mut usernames: Vec<String> = self
            .typing
            .get(conversation_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default();
        usernames.sort();
        usernames
    }
}

impl std::fmt::Debug for TypingTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingTracker")
            .field("conversations", &self.typing.len())
            .field("pending_timers", &self.timers.len())
            .finish()
    }
}
