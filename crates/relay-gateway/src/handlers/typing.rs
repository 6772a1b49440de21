//! Typing indicator handler

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::server::GatewayState;
use relay_core::ConversationId;
use std::sync::Arc;

/// Handles typing start/stop events
pub struct TypingHandler;

impl TypingHandler {
    /// Record a typing change under the connection's display name (or
    /// user ID when none was announced) and broadcast the updated set.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        conversation_id: ConversationId,
        is_typing: bool,
    ) -> HandlerResult<()> {
        let identity = connection
            .identity()
            .await
            .ok_or(HandlerError::NotIdentified)?;

        if conversation_id.is_empty() {
            return Err(HandlerError::InvalidPayload(
                "conversation_id is empty".to_string(),
            ));
        }

        let username = identity
            .display_name
            .unwrap_or_else(|| identity.user_id.as_str().to_string());

        state.typing().set_typing(conversation_id, username, is_typing);

        Ok(())
    }
}
