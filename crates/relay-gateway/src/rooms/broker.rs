//! Room broker
//!
//! Tracks which connections are subscribed to which conversation and
//! fans payloads out to them. Membership permission checks happen
//! upstream; the broker only routes.

use crate::connection::ConnectionRegistry;
use crate::protocol::ServerEvent;
use relay_core::{ConnectionId, ConversationId};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Room membership and delivery
pub struct RoomBroker {
    /// Registry used to resolve live handles at delivery time
    registry: Arc<ConnectionRegistry>,

    /// Conversation ID to member connection IDs mapping
    rooms: DashMap<ConversationId, HashSet<ConnectionId>>,
}

impl RoomBroker {
    /// Create a new room broker
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            rooms: DashMap::new(),
        }
    }

    /// Create a new room broker wrapped in Arc
    #[must_use]
    pub fn new_shared(registry: Arc<ConnectionRegistry>) -> Arc<Self> {
        Arc::new(Self::new(registry))
    }

    /// Subscribe a connection to a conversation. No-op if already a
    /// member.
    pub async fn join(&self, connection_id: &ConnectionId, conversation_id: ConversationId) {
        if let Some(connection) = self.registry.get(connection_id) {
            connection.join_room(conversation_id.clone()).await;
        }

        self.rooms
            .entry(conversation_id.clone())
            .or_default()
            .insert(connection_id.clone());

        tracing::trace!(
            connection_id = %connection_id,
            conversation_id = %conversation_id,
            "Connection joined room"
        );
    }

    /// Remove a connection from one conversation's room
    pub async fn leave(&self, connection_id: &ConnectionId, conversation_id: &ConversationId) {
        if let Some(connection) = self.registry.get(connection_id) {
            connection.leave_room(conversation_id).await;
        }

        self.rooms.alter(conversation_id, |_, mut members| {
            members.remove(connection_id);
            members
        });
        self.rooms.retain(|_, members| !members.is_empty());

        tracing::trace!(
            connection_id = %connection_id,
            conversation_id = %conversation_id,
            "Connection left room"
        );
    }

    /// Remove a connection from every room it had joined. Invoked on
    /// disconnect, in the same teardown step as unregister, so no dead
    /// handle survives in any member set.
    pub async fn leave_all(&self, connection_id: &ConnectionId) {
        // The connection's own room list covers the common case; the
        // sweep below covers a handle already gone from the registry.
        if let Some(connection) = self.registry.get(connection_id) {
            for conversation_id in connection.rooms().await {
                self.rooms.alter(&conversation_id, |_, mut members| {
                    members.remove(connection_id);
                    members
                });
                connection.leave_room(&conversation_id).await;
            }
        } else {
            self.rooms.alter_all(|_, mut members| {
                members.remove(connection_id);
                members
            });
        }

        self.rooms.retain(|_, members| !members.is_empty());

        tracing::trace!(connection_id = %connection_id, "Connection left all rooms");
    }

    /// Deliver an event to every member of a room.
    ///
    /// Iterates over a snapshot of the member set taken at call time;
    /// joins and leaves racing this call are visible only to the next
    /// broadcast. Delivery per connection is fire-and-forget: a full
    /// outbound queue drops that one delivery instead of stalling the
    /// rest. Broadcasting to an empty room is a valid no-op.
    pub fn broadcast(&self, conversation_id: &ConversationId, event: &ServerEvent) -> usize {
        let members: Vec<ConnectionId> = self
            .rooms
            .get(conversation_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default();

        if members.is_empty() {
            return 0;
        }

        let mut sent = 0;
        for connection_id in &members {
            let Some(connection) = self.registry.get(connection_id) else {
                continue;
            };

            match connection.try_send(event.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        conversation_id = %conversation_id,
                        event = event.name(),
                        error = %e,
                        "Dropped room delivery"
                    );
                }
            }
        }

        tracing::trace!(
            conversation_id = %conversation_id,
            event = event.name(),
            members = members.len(),
            sent = sent,
            "Room broadcast"
        );

        sent
    }

    /// Get the current member set of a room
    pub fn members(&self, conversation_id: &ConversationId) -> Vec<ConnectionId> {
        self.rooms
            .get(conversation_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the number of rooms with at least one member
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl std::fmt::Debug for RoomBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomBroker")
            .field("rooms", &self.rooms.len())
            .finish()
    }
}
