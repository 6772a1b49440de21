//! Message dispatcher
//!
//! Orchestrates "send message" as persist-then-broadcast and "private
//! message" as direct-route-or-drop. Holds no connection state of its
//! own; room delivery goes through the broker, direct delivery through
//! the registry.

use crate::connection::{Connection, ConnectionRegistry};
use crate::protocol::ServerEvent;
use crate::rooms::RoomBroker;
use relay_core::{
    ConversationId, ConversationStore, CoordinatorError, MessageStore, MessageView,
    PrivateMessageView, UserId, UserStore,
};
use std::sync::Arc;

/// Enrichment fallback when the sender's name cannot be resolved
const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Routes messages into storage and out to connections
pub struct MessageDispatcher {
    registry: Arc<ConnectionRegistry>,
    broker: Arc<RoomBroker>,
    users: Arc<dyn UserStore>,
    messages: Arc<dyn MessageStore>,
    conversations: Arc<dyn ConversationStore>,
}

impl MessageDispatcher {
    /// Create a new message dispatcher
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broker: Arc<RoomBroker>,
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            broker,
            users,
            messages,
            conversations,
        })
    }

    /// Persist a message, then fan it out to its conversation's room.
    ///
    /// Fails closed on persistence: nothing is broadcast unless the
    /// store accepted the message, so a client re-fetching history
    /// after the broadcast sees exactly what was broadcast. The
    /// `last_message` update and sender-name lookup fail open: the
    /// message is durable by then, so failures are logged and the
    /// broadcast proceeds with best-effort metadata.
    ///
    /// Those lookups sit between persist and broadcast, so two sends
    /// racing on the same conversation broadcast in the order their
    /// lookups finish, which may differ from persistence order. The
    /// stored history is the canonical order either way.
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        text: &str,
    ) -> Result<MessageView, CoordinatorError> {
        if conversation_id.is_empty() {
            return Err(CoordinatorError::invalid("conversation_id"));
        }
        if sender_id.is_empty() {
            return Err(CoordinatorError::invalid("sender_id"));
        }
        if text.trim().is_empty() {
            return Err(CoordinatorError::invalid("text"));
        }

        let message = self
            .messages
            .create(conversation_id, sender_id, text)
            .await
            .map_err(|e| CoordinatorError::Persistence(e.to_string()))?;

        if let Err(e) = self
            .conversations
            .update_last_message(conversation_id, &message.id)
            .await
        {
            tracing::warn!(
                conversation_id = %conversation_id,
                message_id = %message.id,
                error = %e,
                "last_message update failed, broadcasting anyway"
            );
        }

        let sender_name = self.resolve_sender_name(sender_id).await;
        let view = MessageView::from_message(message, sender_name);

        let sent = self
            .broker
            .broadcast(conversation_id, &ServerEvent::RoomMessage(view.clone()));

        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = %view.id,
            sender_id = %sender_id,
            sent = sent,
            "Message persisted and broadcast"
        );

        Ok(view)
    }

    /// Deliver a payload to every live connection of one user.
    ///
    /// Never persisted. An offline recipient is an expected outcome:
    /// nothing is queued and the error instructs the caller to
    /// acknowledge the sender.
    pub async fn send_private(
        &self,
        from: &Arc<Connection>,
        to_user_id: &UserId,
        body: &str,
    ) -> Result<usize, CoordinatorError> {
        let identity = from
            .identity()
            .await
            .ok_or_else(|| CoordinatorError::Unauthorized("private message".to_string()))?;

        if to_user_id.is_empty() {
            return Err(CoordinatorError::invalid("to_user_id"));
        }
        if body.is_empty() {
            return Err(CoordinatorError::invalid("body"));
        }

        let targets = self.registry.connections_for_user(to_user_id);
        if targets.is_empty() {
            tracing::debug!(
                to_user_id = %to_user_id,
                from_user_id = %identity.user_id,
                "Private message recipient offline"
            );
            return Err(CoordinatorError::RecipientOffline(to_user_id.clone()));
        }

        let from_display_name = match identity.display_name {
            Some(name) => name,
            None => self.resolve_sender_name(&identity.user_id).await,
        };

        let payload = ServerEvent::PrivateMessage(PrivateMessageView {
            body: body.to_string(),
            from_user_id: identity.user_id.clone(),
            from_display_name,
            timestamp: chrono::Utc::now(),
        });

        // All of the recipient's devices get it, not just one
        let mut sent = 0;
        for connection in &targets {
            match connection.try_send(payload.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection.id(),
                        to_user_id = %to_user_id,
                        error = %e,
                        "Dropped private delivery"
                    );
                }
            }
        }

        tracing::debug!(
            to_user_id = %to_user_id,
            from_user_id = %identity.user_id,
            sent = sent,
            "Private message delivered"
        );

        Ok(sent)
    }

    /// Best-effort sender name: store lookup first, then any name
    /// recorded on the sender's live connections, then "Unknown".
    async fn resolve_sender_name(&self, sender_id: &UserId) -> String {
        match self.users.display_name(sender_id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(
                    user_id = %sender_id,
                    error = %e,
                    "Sender name lookup failed, using best-effort metadata"
                );
                self.registry
                    .live_display_name(sender_id)
                    .await
                    .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())
            }
        }
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Identity;
    use crate::stores::{InMemoryConversationStore, InMemoryMessageStore, InMemoryUserStore};
    use relay_core::{ConnectionId, MessageStatus};
    use tokio::sync::mpsc;

    struct Harness {
        registry: Arc<ConnectionRegistry>,
        broker: Arc<RoomBroker>,
        users: Arc<InMemoryUserStore>,
        messages: Arc<InMemoryMessageStore>,
        conversations: Arc<InMemoryConversationStore>,
        dispatcher: Arc<MessageDispatcher>,
    }

    fn harness() -> Harness {
        let registry = ConnectionRegistry::new_shared();
        let broker = RoomBroker::new_shared(registry.clone());
        let users = Arc::new(InMemoryUserStore::new());
        let messages = Arc::new(InMemoryMessageStore::new());
        let conversations = Arc::new(InMemoryConversationStore::new());
        let dispatcher = MessageDispatcher::new(
            registry.clone(),
            broker.clone(),
            users.clone(),
            messages.clone(),
            conversations.clone(),
        );
        Harness {
            registry,
            broker,
            users,
            messages,
            conversations,
            dispatcher,
        }
    }

    async fn connect_as(
        h: &Harness,
        user: &str,
    ) -> (Arc<Connection>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = Connection::new(ConnectionId::generate(), tx);
        conn.bind_identity(Identity {
            user_id: UserId::new(user),
            display_name: None,
        })
        .await;
        h.registry.register(conn.clone()).await;
        (conn, rx)
    }

    #[tokio::test]
    async fn test_send_message_rejects_empty_fields() {
        let h = harness();
        let room = ConversationId::new("room1");

        let err = h
            .dispatcher
            .send_message(&room, &UserId::new("u1"), "  ")
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        let err = h
            .dispatcher
            .send_message(&ConversationId::new(""), &UserId::new("u1"), "hi")
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());

        // No side effects on rejection
        assert_eq!(h.messages.count(), 0);
    }

    #[tokio::test]
    async fn test_send_message_persists_then_broadcasts() {
        let h = harness();
        h.users.insert(UserId::new("u1"), "alice");
        let room = ConversationId::new("room1");

        let (conn, mut rx) = connect_as(&h, "u1").await;
        h.broker.join(conn.id(), room.clone()).await;

        let view = h
            .dispatcher
            .send_message(&room, &UserId::new("u1"), "hi")
            .await
            .unwrap();

        assert_eq!(view.text, "hi");
        assert_eq!(view.sender_name, "alice");
        assert_eq!(view.status, MessageStatus::Sent);
        assert_eq!(h.messages.count(), 1);
        assert_eq!(
            h.conversations.last_message(&room).as_deref(),
            Some(view.id.as_str())
        );

        // Sender is included in the fan-out
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, ServerEvent::RoomMessage(m) if m.text == "hi"));
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_broadcast() {
        let h = harness();
        h.messages.fail_next_create();
        let room = ConversationId::new("room1");

        let (conn, mut rx) = connect_as(&h, "u1").await;
        h.broker.join(conn.id(), room.clone()).await;

        let err = h
            .dispatcher
            .send_message(&room, &UserId::new("u1"), "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::Persistence(_)));
        assert_eq!(h.messages.count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_enrichment_failure_still_broadcasts() {
        let h = harness();
        // No user record: display-name lookup fails
        h.conversations.fail_next_update();
        let room = ConversationId::new("room1");

        let (conn, mut rx) = connect_as(&h, "u1").await;
        h.broker.join(conn.id(), room.clone()).await;

        let view = h
            .dispatcher
            .send_message(&room, &UserId::new("u1"), "hi")
            .await
            .unwrap();

        assert_eq!(view.sender_name, "Unknown");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_private_message_reaches_all_devices() {
        let h = harness();
        h.users.insert(UserId::new("c"), "carol");

        let (sender, _rx_c) = connect_as(&h, "c").await;
        let (_d1, mut rx_d1) = connect_as(&h, "d").await;
        let (_d2, mut rx_d2) = connect_as(&h, "d").await;

        let sent = h
            .dispatcher
            .send_private(&sender, &UserId::new("d"), "psst")
            .await
            .unwrap();

        assert_eq!(sent, 2);
        for rx in [&mut rx_d1, &mut rx_d2] {
            let event = rx.try_recv().unwrap();
            assert!(matches!(
                event,
                ServerEvent::PrivateMessage(p)
                    if p.body == "psst" && p.from_display_name == "carol"
            ));
        }
        assert_eq!(h.messages.count(), 0); // never persisted
    }

    #[tokio::test]
    async fn test_private_message_offline_recipient() {
        let h = harness();
        let (sender, _rx) = connect_as(&h, "c").await;

        let err = h
            .dispatcher
            .send_private(&sender, &UserId::new("d"), "psst")
            .await
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::RecipientOffline(_)));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn test_private_message_requires_identity() {
        let h = harness();
        let (tx, _rx) = mpsc::channel(8);
        let anonymous = Connection::new(ConnectionId::generate(), tx);
        h.registry.register(anonymous.clone()).await;

        let err = h
            .dispatcher
            .send_private(&anonymous, &UserId::new("d"), "psst")
            .await
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::Unauthorized(_)));
    }
}
