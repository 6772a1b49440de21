//! Test harness
//!
//! Wires registry, broker, typing tracker, dispatcher, and lifecycle
//! over in-memory stores. Each client owns the receiving half of its
//! connection's outbound queue, exactly what the WebSocket send task
//! would drain in production.

use relay_common::{AppConfig, Environment, GatewayConfig};
use relay_core::{ConversationId, MessageView, PresenceEntry, UserId};
use relay_gateway::connection::{Connection, ConnectionRegistry};
use relay_gateway::dispatch::MessageDispatcher;
use relay_gateway::handlers::{EventRouter, HandlerResult};
use relay_gateway::lifecycle::ConnectionLifecycle;
use relay_gateway::protocol::{ClientEvent, ServerEvent};
use relay_gateway::rooms::RoomBroker;
use relay_gateway::server::GatewayState;
use relay_gateway::stores::{InMemoryConversationStore, InMemoryMessageStore, InMemoryUserStore};
use relay_gateway::typing::TypingTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Outbound queue capacity used by test clients
pub const TEST_QUEUE_CAPACITY: usize = 64;

/// A fully wired in-process gateway
pub struct TestGateway {
    pub state: GatewayState,
    pub users: Arc<InMemoryUserStore>,
    pub messages: Arc<InMemoryMessageStore>,
    pub conversations: Arc<InMemoryConversationStore>,
}

impl TestGateway {
    /// Start a gateway with the default typing expiry
    #[must_use]
    pub fn start() -> Self {
        Self::with_typing_expiry(Duration::from_secs(2))
    }

    /// Start a gateway with a custom typing expiry, for tests that
    /// wait expiry out
    #[must_use]
    pub fn with_typing_expiry(expiry: Duration) -> Self {
        let registry = ConnectionRegistry::new_shared();
        let broker = RoomBroker::new_shared(registry.clone());
        let typing = TypingTracker::with_expiry(broker.clone(), expiry);

        let users = Arc::new(InMemoryUserStore::new());
        let messages = Arc::new(InMemoryMessageStore::new());
        let conversations = Arc::new(InMemoryConversationStore::new());

        let dispatcher = MessageDispatcher::new(
            registry.clone(),
            broker.clone(),
            users.clone(),
            messages.clone(),
            conversations.clone(),
        );
        let lifecycle = ConnectionLifecycle::new(registry.clone(), broker.clone(), users.clone());

        let state = GatewayState::new(
            registry,
            broker,
            typing,
            dispatcher,
            lifecycle,
            users.clone(),
            AppConfig {
                name: "relay-test".to_string(),
                env: Environment::Development,
                gateway: GatewayConfig::default(),
            },
        );

        Self {
            state,
            users,
            messages,
            conversations,
        }
    }

    /// Open a new anonymous client
    pub async fn connect(&self) -> TestClient {
        let (tx, rx) = mpsc::channel(TEST_QUEUE_CAPACITY);
        let connection = self.state.lifecycle().connect(tx, None).await;
        TestClient {
            state: self.state.clone(),
            connection,
            rx,
        }
    }

    /// Open a client and identify it in one step
    pub async fn connect_as(&self, user_id: &str, display_name: Option<&str>) -> TestClient {
        let client = self.connect().await;
        client
            .identify(user_id, display_name)
            .await
            .unwrap_or_else(|e| panic!("identify {user_id} failed: {e}"));
        client
    }
}

/// A simulated client: one connection plus its outbound queue
pub struct TestClient {
    state: GatewayState,
    pub connection: Arc<Connection>,
    rx: mpsc::Receiver<ServerEvent>,
}

impl TestClient {
    /// Route one client event, as the WebSocket receive loop would
    pub async fn send(&self, event: ClientEvent) -> HandlerResult<()> {
        EventRouter::dispatch(&self.state, &self.connection, event).await
    }

    pub async fn identify(&self, user_id: &str, display_name: Option<&str>) -> HandlerResult<()> {
        self.send(ClientEvent::Identify {
            user_id: UserId::new(user_id),
            display_name: display_name.map(String::from),
        })
        .await
    }

    pub async fn join(&self, room: &str) -> HandlerResult<()> {
        self.send(ClientEvent::JoinRoom {
            conversation_id: ConversationId::new(room),
        })
        .await
    }

    pub async fn send_message(&self, room: &str, text: &str) -> HandlerResult<()> {
        self.send(ClientEvent::SendMessage {
            conversation_id: ConversationId::new(room),
            text: text.to_string(),
        })
        .await
    }

    pub async fn typing(&self, room: &str, is_typing: bool) -> HandlerResult<()> {
        self.send(ClientEvent::Typing {
            conversation_id: ConversationId::new(room),
            is_typing,
        })
        .await
    }

    pub async fn private(&self, to_user_id: &str, body: &str) -> HandlerResult<()> {
        self.send(ClientEvent::PrivateMessage {
            to_user_id: UserId::new(to_user_id),
            body: body.to_string(),
        })
        .await
    }

    /// Tear this client down, as a socket close would
    pub async fn disconnect(&self) {
        self.state.lifecycle().disconnect(&self.connection).await;
    }

    /// Drain every event queued so far
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Drain and keep only room messages
    pub fn drain_messages(&mut self) -> Vec<MessageView> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::RoomMessage(view) => Some(view),
                _ => None,
            })
            .collect()
    }

    /// Drain and return the most recent presence snapshot, if any
    pub fn last_presence(&mut self) -> Option<Vec<PresenceEntry>> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::PresenceSnapshot { users } => Some(users),
                _ => None,
            })
            .last()
    }
}
