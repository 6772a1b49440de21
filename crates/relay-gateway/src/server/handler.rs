//! WebSocket handler
//!
//! Accepts upgrades, pumps frames in and out, and ties the socket's
//! fate to the connection lifecycle.

use crate::connection::Connection;
use crate::handlers::EventRouter;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::server::GatewayState;
use axum::{
    extract::{ws::Message, Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use relay_core::UserId;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Optional connect-time parameters
///
/// A `user_id` here stands for an identity the outer layer has already
/// validated; the connection skips the identify round-trip.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    user_id: Option<String>,
}

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket, params))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(
    state: GatewayState,
    socket: axum::extract::ws::WebSocket,
    params: ConnectParams,
) {
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(state.config().gateway.outbound_queue);

    let pre_auth = params
        .user_id
        .map(UserId::new)
        .filter(|id| !id.is_empty());

    let connection = state.lifecycle().connect(tx, pre_auth).await;

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Receive loop: parse frames and route them. Handler errors are
    // reported on the same connection; only transport failures and
    // client closes end the loop.
    let state_recv = state.clone();
    let connection_recv = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_frame(&state_recv, &connection_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        connection_id = %connection_recv.id(),
                        "Binary frames not supported"
                    );
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        connection_id = %connection_recv.id(),
                        "Client closed connection"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_recv.id(),
                        error = %e,
                        "WebSocket error"
                    );
                    return;
                }
            }
        }
    });

    // Send loop: serialize queued events onto the socket. Holds only
    // the connection id, not the handle, so the queue can actually
    // close underneath it.
    let connection_id = connection.id().clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(
                            connection_id = %connection_id,
                            "Failed to send frame, closing"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %connection_id,
                        error = %e,
                        "Failed to serialize event"
                    );
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    // Either side ending tears the connection down
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    state.lifecycle().disconnect(&connection).await;
}

/// Parse and route one text frame. Failures never close the
/// connection; the client is told what went wrong instead.
async fn handle_text_frame(state: &GatewayState, connection: &Arc<Connection>, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.id(),
                error = %e,
                "Failed to parse frame"
            );
            report_failure(connection, "INVALID_ARGUMENT").await;
            return;
        }
    };

    if let Err(e) = EventRouter::dispatch(state, connection, event).await {
        tracing::debug!(
            connection_id = %connection.id(),
            error = %e,
            "Handler error"
        );
        report_failure(connection, e.reason_code()).await;
    }
}

async fn report_failure(connection: &Arc<Connection>, reason: &str) {
    let event = ServerEvent::SendFailed {
        reason: reason.to_string(),
    };
    if let Err(e) = connection.send(event).await {
        tracing::debug!(
            connection_id = %connection.id(),
            error = %e,
            "Failed to report handler error"
        );
    }
}
