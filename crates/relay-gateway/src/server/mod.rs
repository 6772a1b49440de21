//! Gateway server setup
//!
//! Provides the main WebSocket server configuration and routes.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::connection::ConnectionRegistry;
use crate::dispatch::MessageDispatcher;
use crate::lifecycle::ConnectionLifecycle;
use crate::rooms::RoomBroker;
use crate::stores::{InMemoryConversationStore, InMemoryMessageStore, InMemoryUserStore};
use crate::typing::TypingTracker;
use axum::{routing::get, Router};
use relay_common::{AppConfig, AppError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire up all coordinator components and create `GatewayState`
pub fn create_gateway_state(config: AppConfig) -> GatewayState {
    let registry = ConnectionRegistry::new_shared();
    let broker = RoomBroker::new_shared(registry.clone());
    let typing = TypingTracker::with_expiry(
        broker.clone(),
        Duration::from_millis(config.gateway.typing_expiry_ms),
    );

    let users = Arc::new(InMemoryUserStore::new());
    let messages = Arc::new(InMemoryMessageStore::new());
    let conversations = Arc::new(InMemoryConversationStore::new());

    let dispatcher = MessageDispatcher::new(
        registry.clone(),
        broker.clone(),
        users.clone(),
        messages,
        conversations,
    );
    let lifecycle = ConnectionLifecycle::new(registry.clone(), broker.clone(), users.clone());

    GatewayState::new(
        registry, broker, typing, dispatcher, lifecycle, users, config,
    )
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting gateway server on {}", addr);

    let listener = TcpListener::bind(addr).await.map_err(|e| AppError::Bind {
        addr: addr.to_string(),
        source: e,
    })?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app).await.map_err(AppError::Server)?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.gateway.port));

    let state = create_gateway_state(config);
    let app = create_app(state);

    run_server(app, addr).await
}
