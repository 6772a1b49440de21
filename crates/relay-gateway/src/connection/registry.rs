//! Connection registry
//!
//! Bidirectional mapping between user identity and live connections,
//! using DashMap for thread-safe access. The registry exclusively owns
//! both maps; presence is derived from them, never stored.

use super::{Connection, Identity};
use crate::protocol::ServerEvent;
use relay_core::{ConnectionId, PresenceEntry, UserId, UserStore};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Presence-snapshot fallback when no name can be resolved anywhere
const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Registry of all live connections
pub struct ConnectionRegistry {
    /// Live connections by connection ID
    connections: DashMap<ConnectionId, Arc<Connection>>,

    /// User ID to connection IDs mapping. A user present here always
    /// has at least one live connection; empty sets are removed in the
    /// same step that empties them.
    user_connections: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Create a new connection registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
        }
    }

    /// Create a new connection registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a connection. Idempotent per connection ID. If the
    /// connection already carries a pre-validated identity, the user
    /// mapping is updated as well.
    pub async fn register(&self, connection: Arc<Connection>) {
        let id = connection.id().clone();
        let user_id = connection.user_id().await;

        self.connections.insert(id.clone(), connection);

        if let Some(user_id) = user_id {
            self.user_connections
                .entry(user_id.clone())
                .or_default()
                .insert(id.clone());

            tracing::debug!(connection_id = %id, user_id = %user_id, "Connection registered (pre-identified)");
        } else {
            tracing::debug!(connection_id = %id, "Connection registered");
        }
    }

    /// Bind or rebind a connection to a user identity.
    ///
    /// Merges into any existing connection set for that user rather
    /// than overwriting; a rebind migrates the connection out of the
    /// previous user's set.
    pub async fn announce(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
        display_name: Option<String>,
    ) -> bool {
        let Some(connection) = self.get(connection_id) else {
            return false;
        };

        let previous = connection
            .bind_identity(Identity {
                user_id: user_id.clone(),
                display_name,
            })
            .await;

        if let Some(previous) = previous.filter(|p| *p != user_id) {
            self.user_connections.alter(&previous, |_, mut set| {
                set.remove(connection_id);
                set
            });
            self.user_connections.retain(|_, set| !set.is_empty());
        }

        self.user_connections
            .entry(user_id.clone())
            .or_default()
            .insert(connection_id.clone());

        tracing::debug!(
            connection_id = %connection_id,
            user_id = %user_id,
            "Connection identified"
        );

        true
    }

    /// Remove a connection.
    ///
    /// Runs synchronously with teardown: the bound user's set loses the
    /// connection and, if emptied, the user drops out of the presence
    /// map entirely. Uses `alter` + `retain` for atomic cleanup.
    pub async fn unregister(&self, connection_id: &ConnectionId) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(connection_id)?;

        if let Some(user_id) = connection.user_id().await {
            self.user_connections.alter(&user_id, |_, mut set| {
                set.remove(connection_id);
                set
            });
            self.user_connections.retain(|_, set| !set.is_empty());
        }

        tracing::debug!(connection_id = %connection_id, "Connection removed");

        Some(connection)
    }

    /// Get a connection by ID
    pub fn get(&self, connection_id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|r| r.clone())
    }

    /// Get all live connections for a user
    pub fn connections_for_user(&self, user_id: &UserId) -> Vec<Arc<Connection>> {
        self.user_connections
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check if a user has at least one live connection
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.user_connections.contains_key(user_id)
    }

    /// Compute the current online-user snapshot.
    ///
    /// Map state is copied out first; the store is only consulted after
    /// every lock is released, for users with no name recorded on any
    /// live connection. Lookup failures fall back to "Unknown" and
    /// never fail the snapshot.
    pub async fn snapshot(&self, users: &dyn UserStore) -> Vec<PresenceEntry> {
        // Point-in-time copy of the user map
        let online: Vec<(UserId, Vec<Arc<Connection>>)> = self
            .user_connections
            .iter()
            .map(|entry| {
                let conns = entry
                    .value()
                    .iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
                    .collect();
                (entry.key().clone(), conns)
            })
            .collect();

        let mut entries = Vec::with_capacity(online.len());

        for (user_id, connections) in online {
            if connections.is_empty() {
                continue;
            }

            let mut display_name = None;
            for connection in &connections {
                if let Some(name) = connection.display_name().await {
                    display_name = Some(name);
                    break;
                }
            }

            let display_name = match display_name {
                Some(name) => name,
                None => match users.display_name(&user_id).await {
                    Ok(name) => name,
                    Err(e) => {
                        tracing::debug!(
                            user_id = %user_id,
                            error = %e,
                            "Display name lookup failed, using fallback"
                        );
                        UNKNOWN_DISPLAY_NAME.to_string()
                    }
                },
            };

            entries.push(PresenceEntry {
                user_id,
                display_name,
                connection_count: connections.len(),
            });
        }

        // Stable output for consumers that diff consecutive snapshots
        entries.sort_by(|a, b| a.user_id.as_str().cmp(b.user_id.as_str()));
        entries
    }

    /// Find a display name recorded on any of the user's live
    /// connections (enrichment fallback)
    pub async fn live_display_name(&self, user_id: &UserId) -> Option<String> {
        for connection in self.connections_for_user(user_id) {
            if let Some(name) = connection.display_name().await {
                return Some(name);
            }
        }
        None
    }

    /// Push an event to every live connection (non-blocking per
    /// connection)
    pub fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let connections: Vec<Arc<Connection>> =
            self.connections.iter().map(|r| r.clone()).collect();

        let mut sent = 0;
        for connection in connections {
            match connection.try_send(event.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        error = %e,
                        "Dropped broadcast delivery"
                    );
                }
            }
        }
        sent
    }

    /// Get the total number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of unique online users
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .finish()
    }
}
