//! Client event handlers
//!
//! Routes parsed client events to their handlers. A handler error is
//! reported back on the same connection and never tears it down.

mod error;
mod identify;
mod message;
mod rooms;
mod typing;

pub use error::{HandlerError, HandlerResult};
pub use identify::IdentifyHandler;
pub use message::{PrivateMessageHandler, SendMessageHandler};
pub use rooms::JoinRoomHandler;
pub use typing::TypingHandler;

use crate::connection::Connection;
use crate::protocol::ClientEvent;
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client events to the appropriate handlers
pub struct EventRouter;

impl EventRouter {
    /// Handle an incoming client event
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        event: ClientEvent,
    ) -> HandlerResult<()> {
        tracing::trace!(
            connection_id = %connection.id(),
            event = event.name(),
            "Received event"
        );

        match event {
            ClientEvent::Identify {
                user_id,
                display_name,
            } => IdentifyHandler::handle(state, connection, user_id, display_name).await,
            ClientEvent::JoinRoom { conversation_id } => {
                JoinRoomHandler::handle(state, connection, conversation_id).await
            }
            ClientEvent::SendMessage {
                conversation_id,
                text,
            } => SendMessageHandler::handle(state, connection, conversation_id, text).await,
            ClientEvent::Typing {
                conversation_id,
                is_typing,
            } => TypingHandler::handle(state, connection, conversation_id, is_typing).await,
            ClientEvent::PrivateMessage { to_user_id, body } => {
                PrivateMessageHandler::handle(state, connection, to_user_id, body).await
            }
        }
    }
}
