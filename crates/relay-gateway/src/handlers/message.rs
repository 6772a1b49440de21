//! Message send handlers

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use relay_core::{ConversationId, CoordinatorError, UserId};
use std::sync::Arc;

/// Handles room message sends
pub struct SendMessageHandler;

impl SendMessageHandler {
    /// Persist and broadcast a message on behalf of the connection's
    /// bound user. The sender receives the broadcast through its own
    /// room membership, not a separate acknowledgement.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        conversation_id: ConversationId,
        text: String,
    ) -> HandlerResult<()> {
        let sender_id = connection
            .user_id()
            .await
            .ok_or(HandlerError::NotIdentified)?;

        state
            .dispatcher()
            .send_message(&conversation_id, &sender_id, &text)
            .await?;

        Ok(())
    }
}

/// Handles private message sends
pub struct PrivateMessageHandler;

impl PrivateMessageHandler {
    /// Route a direct payload to the recipient's connections.
    ///
    /// An offline recipient is answered with a sender-only
    /// acknowledgement rather than an error; nothing was wrong with the
    /// request, the recipient just was not there.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        to_user_id: UserId,
        body: String,
    ) -> HandlerResult<()> {
        match state
            .dispatcher()
            .send_private(connection, &to_user_id, &body)
            .await
        {
            Ok(_) => Ok(()),
            Err(CoordinatorError::RecipientOffline(to_user_id)) => {
                let ack = ServerEvent::PrivateMessageAck {
                    to_user_id,
                    delivered: false,
                    reason: Some("RECIPIENT_OFFLINE".to_string()),
                };
                if let Err(e) = connection.send(ack).await {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        error = %e,
                        "Failed to deliver offline acknowledgement"
                    );
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
