//! Identify handler

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::server::GatewayState;
use relay_core::UserId;
use std::sync::Arc;

/// Handles identify events
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Bind the connection to a user identity.
    ///
    /// Re-identifying is allowed and rebinds: the registry migrates the
    /// connection between user sets. Either way the whole server gets a
    /// fresh presence snapshot.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        user_id: UserId,
        display_name: Option<String>,
    ) -> HandlerResult<()> {
        if user_id.is_empty() {
            return Err(HandlerError::InvalidPayload("user_id is empty".to_string()));
        }

        state
            .registry()
            .announce(connection.id(), user_id.clone(), display_name)
            .await;

        state.lifecycle().mark_online(&user_id).await;
        state.lifecycle().broadcast_presence().await;

        tracing::info!(
            connection_id = %connection.id(),
            user_id = %user_id,
            "Client identified"
        );

        Ok(())
    }
}
