//! Gateway state
//!
//! Application state for the gateway server.

use crate::connection::ConnectionRegistry;
use crate::dispatch::MessageDispatcher;
use crate::lifecycle::ConnectionLifecycle;
use crate::rooms::RoomBroker;
use crate::typing::TypingTracker;
use relay_common::AppConfig;
use relay_core::UserStore;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Registry of live connections
    registry: Arc<ConnectionRegistry>,
    /// Room membership and fan-out
    broker: Arc<RoomBroker>,
    /// Typing indicators
    typing: Arc<TypingTracker>,
    /// Message persistence and routing
    dispatcher: Arc<MessageDispatcher>,
    /// Connection setup and teardown
    lifecycle: Arc<ConnectionLifecycle>,
    /// User records
    users: Arc<dyn UserStore>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broker: Arc<RoomBroker>,
        typing: Arc<TypingTracker>,
        dispatcher: Arc<MessageDispatcher>,
        lifecycle: Arc<ConnectionLifecycle>,
        users: Arc<dyn UserStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            registry,
            broker,
            typing,
            dispatcher,
            lifecycle,
            users,
            config: Arc::new(config),
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the room broker
    pub fn broker(&self) -> &RoomBroker {
        &self.broker
    }

    /// Get the typing tracker
    pub fn typing(&self) -> &Arc<TypingTracker> {
        &self.typing
    }

    /// Get the message dispatcher
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// Get the connection lifecycle
    pub fn lifecycle(&self) -> &ConnectionLifecycle {
        &self.lifecycle
    }

    /// Get the user store
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .field("broker", &self.broker)
            .finish()
    }
}
