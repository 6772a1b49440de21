//! Connection lifecycle
//!
//! Ties accept and teardown together so every side effect of a
//! connection's existence is undone exactly once: registry entry, room
//! memberships, the user's online flag, and the presence broadcast that
//! tells everyone else.

use crate::connection::{Connection, ConnectionRegistry, Identity};
use crate::protocol::ServerEvent;
use crate::rooms::RoomBroker;
use relay_core::{ConnectionId, UserId, UserStore};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Orchestrates connection setup and teardown
pub struct ConnectionLifecycle {
    registry: Arc<ConnectionRegistry>,
    broker: Arc<RoomBroker>,
    users: Arc<dyn UserStore>,
}

impl ConnectionLifecycle {
    /// Create a new lifecycle orchestrator
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broker: Arc<RoomBroker>,
        users: Arc<dyn UserStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            broker,
            users,
        })
    }

    /// Accept a new connection.
    ///
    /// With a pre-validated identity (for example from the transport's
    /// query string) the connection skips the `Anonymous` phase: it is
    /// registered as identified, the user's online flag is raised, and
    /// a presence snapshot goes out immediately.
    pub async fn connect(
        &self,
        sender: mpsc::Sender<ServerEvent>,
        pre_auth: Option<UserId>,
    ) -> Arc<Connection> {
        let connection = Connection::new(ConnectionId::generate(), sender);

        if let Some(user_id) = pre_auth {
            connection
                .bind_identity(Identity {
                    user_id: user_id.clone(),
                    display_name: None,
                })
                .await;
            self.registry.register(connection.clone()).await;
            self.mark_online(&user_id).await;
            self.broadcast_presence().await;
        } else {
            self.registry.register(connection.clone()).await;
        }

        tracing::info!(
            connection_id = %connection.id(),
            total = self.registry.connection_count(),
            "Connection accepted"
        );

        connection
    }

    /// Tear down a connection.
    ///
    /// Idempotent: a second call for the same connection returns
    /// without side effects. Teardown runs in one step with the
    /// registry and broker updates, so the very next presence snapshot
    /// and room broadcast already exclude this connection.
    pub async fn disconnect(&self, connection: &Arc<Connection>) {
        if !connection.mark_closed().await {
            return;
        }

        self.broker.leave_all(connection.id()).await;
        self.registry.unregister(connection.id()).await;

        if let Some(user_id) = connection.user_id().await {
            // Only the user's last connection flips the flag
            if !self.registry.is_online(&user_id) {
                self.mark_offline(&user_id).await;
            }
        }

        self.broadcast_presence().await;

        tracing::info!(
            connection_id = %connection.id(),
            total = self.registry.connection_count(),
            "Connection closed"
        );
    }

    /// Push the current online-user snapshot to every live connection
    pub async fn broadcast_presence(&self) {
        let users = self.registry.snapshot(self.users.as_ref()).await;
        self.registry
            .broadcast_all(&ServerEvent::PresenceSnapshot { users });
    }

    /// Raise the persisted online flag, best-effort
    pub async fn mark_online(&self, user_id: &UserId) {
        if let Err(e) = self.users.set_online_status(user_id, true).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to persist online status");
        }
    }

    async fn mark_offline(&self, user_id: &UserId) {
        if let Err(e) = self.users.set_online_status(user_id, false).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to persist offline status");
        }
    }
}

impl std::fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle").finish()
    }
}
