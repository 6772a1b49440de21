//! Coordinator integration tests
//!
//! End-to-end scenarios across the full coordinator: presence, rooms,
//! message dispatch, typing, and private delivery, driven the way the
//! WebSocket layer drives them.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use integration_tests::TestGateway;
use relay_core::{ConversationId, UserId};
use relay_gateway::protocol::ServerEvent;
use std::time::Duration;

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_presence_tracks_identify_and_disconnect() {
    let gw = TestGateway::start();

    let mut alice = gw.connect_as("u-alice", Some("Alice")).await;
    let mut bob = gw.connect_as("u-bob", Some("Bob")).await;

    // Bob identified last, so his latest snapshot has both users
    let users = bob.last_presence().expect("no presence snapshot");
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].user_id, UserId::new("u-alice"));
    assert_eq!(users[0].display_name, "Alice");
    assert_eq!(users[1].user_id, UserId::new("u-bob"));

    bob.disconnect().await;

    let users = alice.last_presence().expect("no presence snapshot");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, UserId::new("u-alice"));
}

#[tokio::test]
async fn test_user_stays_present_until_last_device_leaves() {
    let gw = TestGateway::start();

    let mut alice = gw.connect_as("u-alice", Some("Alice")).await;
    let phone = gw.connect_as("u-bob", Some("Bob")).await;
    let laptop = gw.connect_as("u-bob", Some("Bob")).await;

    phone.disconnect().await;
    let users = alice.last_presence().expect("no presence snapshot");
    assert_eq!(users.len(), 2, "one device left, still online");
    assert_eq!(gw.users.online_flag(&UserId::new("u-bob")), Some(true));

    laptop.disconnect().await;
    let users = alice.last_presence().expect("no presence snapshot");
    assert_eq!(users.len(), 1);
    assert_eq!(gw.users.online_flag(&UserId::new("u-bob")), Some(false));
}

#[tokio::test]
async fn test_presence_falls_back_to_stored_then_unknown_name() {
    let gw = TestGateway::start();
    gw.users.insert(UserId::new("u-known"), "Stored Name");

    let _known = gw.connect_as("u-known", None).await;
    let mut nameless = gw.connect_as("u-ghost", None).await;

    let users = nameless.last_presence().expect("no presence snapshot");
    let known = users
        .iter()
        .find(|u| u.user_id == UserId::new("u-known"))
        .unwrap();
    let ghost = users
        .iter()
        .find(|u| u.user_id == UserId::new("u-ghost"))
        .unwrap();

    assert_eq!(known.display_name, "Stored Name");
    assert_eq!(ghost.display_name, "Unknown");
}

// ============================================================================
// Rooms and message dispatch
// ============================================================================

#[tokio::test]
async fn test_room_message_reaches_every_member_device() {
    let gw = TestGateway::start();
    gw.users.insert(UserId::new("u-alice"), "Alice");

    let mut a1 = gw.connect_as("u-alice", Some("Alice")).await;
    let mut a2 = gw.connect_as("u-alice", Some("Alice")).await;
    let mut b1 = gw.connect_as("u-bob", Some("Bob")).await;
    let mut outsider = gw.connect_as("u-carol", Some("Carol")).await;

    for client in [&a1, &a2, &b1] {
        client.join("room-1").await.unwrap();
    }

    a1.send_message("room-1", "hi").await.unwrap();

    for client in [&mut a1, &mut a2, &mut b1] {
        let messages = client.drain_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[0].sender_name, "Alice");
    }
    assert!(outsider.drain_messages().is_empty());

    // Persisted exactly once, and the conversation points at it
    assert_eq!(gw.messages.count(), 1);
    let room = ConversationId::new("room-1");
    assert_eq!(
        gw.conversations.last_message(&room),
        Some(gw.messages.history(&room)[0].id.clone())
    );
}

#[tokio::test]
async fn test_membership_is_read_at_send_time() {
    let gw = TestGateway::start();

    let alice = gw.connect_as("u-alice", Some("Alice")).await;
    let mut bob = gw.connect_as("u-bob", Some("Bob")).await;

    alice.join("room-1").await.unwrap();
    alice.send_message("room-1", "before").await.unwrap();

    // Bob joins after the first send; only the second reaches him
    bob.join("room-1").await.unwrap();
    alice.send_message("room-1", "after").await.unwrap();

    let texts: Vec<String> = bob.drain_messages().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["after"]);
}

#[tokio::test]
async fn test_persistence_failure_suppresses_broadcast() {
    let gw = TestGateway::start();

    let alice = gw.connect_as("u-alice", Some("Alice")).await;
    let mut bob = gw.connect_as("u-bob", Some("Bob")).await;
    alice.join("room-1").await.unwrap();
    bob.join("room-1").await.unwrap();

    gw.messages.fail_next_create();
    let err = alice.send_message("room-1", "lost").await.unwrap_err();

    assert_eq!(err.reason_code(), "PERSISTENCE_ERROR");
    assert!(bob.drain_messages().is_empty());
    assert_eq!(gw.messages.count(), 0);

    // The store recovered, the next send goes through
    alice.send_message("room-1", "retry").await.unwrap();
    assert_eq!(bob.drain_messages().len(), 1);
}

#[tokio::test]
async fn test_send_requires_identity() {
    let gw = TestGateway::start();
    let anon = gw.connect().await;

    let err = anon.send_message("room-1", "hi").await.unwrap_err();
    assert_eq!(err.reason_code(), "UNAUTHORIZED");
    assert_eq!(gw.messages.count(), 0);
}

// ============================================================================
// Typing indicators
// ============================================================================

#[tokio::test]
async fn test_typing_set_broadcasts_and_expires() {
    let gw = TestGateway::with_typing_expiry(Duration::from_millis(50));

    let alice = gw.connect_as("u-alice", Some("Alice")).await;
    let mut bob = gw.connect_as("u-bob", Some("Bob")).await;
    alice.join("room-1").await.unwrap();
    bob.join("room-1").await.unwrap();

    alice.typing("room-1", true).await.unwrap();

    let snapshots: Vec<Vec<String>> = bob
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::TypingSnapshot(view) => Some(view.usernames),
            _ => None,
        })
        .collect();
    assert_eq!(snapshots, vec![vec!["Alice".to_string()]]);

    // Without a refresh the entry expires and the room hears about it
    tokio::time::sleep(Duration::from_millis(150)).await;

    let snapshots: Vec<Vec<String>> = bob
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::TypingSnapshot(view) => Some(view.usernames),
            _ => None,
        })
        .collect();
    assert_eq!(snapshots, vec![Vec::<String>::new()]);
}

#[tokio::test]
async fn test_typing_stop_clears_without_waiting() {
    let gw = TestGateway::start();

    let alice = gw.connect_as("u-alice", Some("Alice")).await;
    let mut bob = gw.connect_as("u-bob", Some("Bob")).await;
    alice.join("room-1").await.unwrap();
    bob.join("room-1").await.unwrap();

    alice.typing("room-1", true).await.unwrap();
    alice.typing("room-1", false).await.unwrap();

    let last = bob
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::TypingSnapshot(view) => Some(view.usernames),
            _ => None,
        })
        .last();
    assert_eq!(last, Some(vec![]));
}

// ============================================================================
// Private messages
// ============================================================================

#[tokio::test]
async fn test_private_message_hits_all_recipient_devices() {
    let gw = TestGateway::start();

    let carol = gw.connect_as("u-carol", Some("Carol")).await;
    let mut d_phone = gw.connect_as("u-dave", Some("Dave")).await;
    let mut d_laptop = gw.connect_as("u-dave", Some("Dave")).await;

    carol.private("u-dave", "psst").await.unwrap();

    for device in [&mut d_phone, &mut d_laptop] {
        let received: Vec<_> = device
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::PrivateMessage(view) => Some(view),
                _ => None,
            })
            .collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body, "psst");
        assert_eq!(received[0].from_user_id, UserId::new("u-carol"));
        assert_eq!(received[0].from_display_name, "Carol");
    }

    // Direct payloads are never persisted
    assert_eq!(gw.messages.count(), 0);
}

#[tokio::test]
async fn test_private_message_offline_acks_sender_only() {
    let gw = TestGateway::start();

    let mut carol = gw.connect_as("u-carol", Some("Carol")).await;
    let mut bystander = gw.connect_as("u-bob", Some("Bob")).await;

    carol.private("u-dave", "anyone there").await.unwrap();

    let acks: Vec<_> = carol
        .drain()
        .into_iter()
        .filter(|e| matches!(e, ServerEvent::PrivateMessageAck { .. }))
        .collect();
    assert_eq!(acks.len(), 1);
    assert!(matches!(
        &acks[0],
        ServerEvent::PrivateMessageAck {
            to_user_id,
            delivered: false,
            reason: Some(reason),
        } if *to_user_id == UserId::new("u-dave") && reason == "RECIPIENT_OFFLINE"
    ));

    assert!(!bystander
        .drain()
        .iter()
        .any(|e| matches!(e, ServerEvent::PrivateMessageAck { .. })));
}

// ============================================================================
// Disconnect cleanup
// ============================================================================

#[tokio::test]
async fn test_disconnect_leaves_rooms_and_presence() {
    let gw = TestGateway::start();

    let alice = gw.connect_as("u-alice", Some("Alice")).await;
    let mut bob = gw.connect_as("u-bob", Some("Bob")).await;
    alice.join("room-1").await.unwrap();
    bob.join("room-1").await.unwrap();

    alice.disconnect().await;
    // Double disconnect must be harmless
    alice.disconnect().await;

    bob.send_message("room-1", "still here").await.unwrap();
    assert_eq!(bob.drain_messages().len(), 1);

    let users = bob.last_presence();
    // drain_messages above consumed the queue, so re-check via state
    assert!(users.is_none() || users.unwrap().len() == 1);
    assert_eq!(gw.state.registry().connection_count(), 1);
    assert!(!gw.state.registry().is_online(&UserId::new("u-alice")));
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn test_frames_round_trip_as_tagged_json() {
    use relay_gateway::protocol::ClientEvent;

    let frame = r#"{"event":"send_message","data":{"conversation_id":"room-1","text":"hi"}}"#;
    let event = ClientEvent::from_json(frame).unwrap();
    assert_eq!(event.name(), "send_message");

    let out = ServerEvent::SendFailed {
        reason: "INVALID_ARGUMENT".to_string(),
    }
    .to_json()
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["event"], "send_failed");
    assert_eq!(value["data"]["reason"], "INVALID_ARGUMENT");
}
