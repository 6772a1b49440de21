//! Room join handler

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::server::GatewayState;
use relay_core::ConversationId;
use std::sync::Arc;

/// Handles join-room events
pub struct JoinRoomHandler;

impl JoinRoomHandler {
    /// Subscribe the connection to a conversation's broadcasts
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        conversation_id: ConversationId,
    ) -> HandlerResult<()> {
        if !connection.is_identified().await {
            return Err(HandlerError::NotIdentified);
        }
        if conversation_id.is_empty() {
            return Err(HandlerError::InvalidPayload(
                "conversation_id is empty".to_string(),
            ));
        }

        state.broker().join(connection.id(), conversation_id).await;

        Ok(())
    }
}
