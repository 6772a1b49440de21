//! Individual connection
//!
//! An opaque handle to a single live transport session. Created on
//! transport accept, destroyed on transport close, never reused.

use crate::protocol::ServerEvent;
use relay_core::{ConnectionId, ConversationId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

/// Lifecycle phase of a connection
///
/// `Closed` is terminal; re-entering it is a safe no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Accepted, no identity announced yet
    Anonymous,
    /// Bound to a user identity; room joins and sends allowed
    Identified,
    /// Torn down
    Closed,
}

/// The user identity bound to a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Recorded if the client announced one; presence snapshots prefer
    /// this over a store lookup.
    pub display_name: Option<String>,
}

/// A single live connection
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,

    /// Current lifecycle phase
    phase: RwLock<ConnectionPhase>,

    /// Bound user identity (None until announced)
    identity: RwLock<Option<Identity>>,

    /// Conversations this connection is subscribed to
    rooms: RwLock<HashSet<ConversationId>>,

    /// Bounded channel to the transport's send task
    sender: mpsc::Sender<ServerEvent>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection in the `Anonymous` phase
    pub fn new(id: ConnectionId, sender: mpsc::Sender<ServerEvent>) -> Arc<Self> {
        Arc::new(Self {
            id,
            phase: RwLock::new(ConnectionPhase::Anonymous),
            identity: RwLock::new(None),
            rooms: RwLock::new(HashSet::new()),
            sender,
            created_at: Instant::now(),
        })
    }

    /// Get the connection ID
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Get the current phase
    pub async fn phase(&self) -> ConnectionPhase {
        *self.phase.read().await
    }

    /// Get the bound user ID (if identified)
    pub async fn user_id(&self) -> Option<UserId> {
        self.identity.read().await.as_ref().map(|i| i.user_id.clone())
    }

    /// Get the recorded display name (if any)
    pub async fn display_name(&self) -> Option<String> {
        self.identity
            .read()
            .await
            .as_ref()
            .and_then(|i| i.display_name.clone())
    }

    /// Get the full bound identity
    pub async fn identity(&self) -> Option<Identity> {
        self.identity.read().await.clone()
    }

    /// Bind or rebind the user identity and move to `Identified`.
    ///
    /// Returns the previously bound user, if any, so the registry can
    /// migrate its user mapping.
    pub async fn bind_identity(&self, identity: Identity) -> Option<UserId> {
        let previous = self
            .identity
            .write()
            .await
            .replace(identity)
            .map(|i| i.user_id);
        *self.phase.write().await = ConnectionPhase::Identified;
        previous
    }

    /// Check if the connection has announced an identity
    pub async fn is_identified(&self) -> bool {
        self.identity.read().await.is_some()
    }

    /// Move to `Closed`. Returns false if already closed, making
    /// double-close a no-op for callers.
    pub async fn mark_closed(&self) -> bool {
        let mut phase = self.phase.write().await;
        if *phase == ConnectionPhase::Closed {
            return false;
        }
        *phase = ConnectionPhase::Closed;
        true
    }

    /// Record a room subscription
    pub async fn join_room(&self, conversation_id: ConversationId) {
        self.rooms.write().await.insert(conversation_id);
    }

    /// Remove a room subscription
    pub async fn leave_room(&self, conversation_id: &ConversationId) {
        self.rooms.write().await.remove(conversation_id);
    }

    /// Get all subscribed rooms
    pub async fn rooms(&self) -> Vec<ConversationId> {
        self.rooms.read().await.iter().cloned().collect()
    }

    /// Check if subscribed to a room
    pub async fn is_in_room(&self, conversation_id: &ConversationId) -> bool {
        self.rooms.read().await.contains(conversation_id)
    }

    /// Get connection age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Send an event to this connection, waiting for queue space
    pub async fn send(
        &self,
        event: ServerEvent,
    ) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event).await
    }

    /// Try to send an event without blocking. Fan-out paths use this so
    /// a slow connection only drops its own delivery.
    pub fn try_send(
        &self,
        event: ServerEvent,
    ) -> Result<(), mpsc::error::TrySendError<ServerEvent>> {
        self.sender.try_send(event)
    }

    /// Check if the transport side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish()
    }
}
