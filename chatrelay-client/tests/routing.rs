//! End-to-end routing scenarios: several sessions against one in-process
//! broker, with real listener tasks.

use chatrelay_broker::{Broker, BrokerPtr, MemoryBroker, MemoryStore};
use chatrelay_client::{ChatClient, UserProfile};
use chatrelay_core::config::ClientConfig;
use chatrelay_core::DeliveryReceiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fast_config() -> ClientConfig {
    ClientConfig {
        poll_interval_ms: 10,
        ..ClientConfig::default()
    }
}

async fn connect(hub: &MemoryBroker, store: &MemoryStore) -> ChatClient {
    let broker: BrokerPtr = Arc::new(hub.connect().await);
    ChatClient::new(broker, Arc::new(store.clone()), fast_config())
}

/// Drain the receiver, waiting up to `deadline` for the first item
async fn drain_within(rx: &mut DeliveryReceiver, deadline: Duration) -> Vec<String> {
    let start = Instant::now();
    loop {
        let items = rx.drain();
        if !items.is_empty() || start.elapsed() > deadline {
            return items;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

const WAIT: Duration = Duration::from_millis(500);
const SETTLE: Duration = Duration::from_millis(250);

#[tokio::test]
async fn broadcast_reaches_subscribers_but_not_the_sender() {
    let hub = MemoryBroker::new();
    let store = MemoryStore::new();

    let alice = connect(&hub, &store).await;
    let bob = connect(&hub, &store).await;
    let mut alice_rx = alice.take_receiver().await.unwrap();
    let mut bob_rx = bob.take_receiver().await.unwrap();

    alice
        .identify("alice", UserProfile::default())
        .await
        .unwrap();
    bob.identify("bob", UserProfile::default()).await.unwrap();

    alice.join("news").await.unwrap();
    bob.join("news").await.unwrap();

    bob.send_message("news", "hi").await.unwrap();

    let items = drain_within(&mut alice_rx, WAIT).await;
    assert_eq!(items.len(), 1);
    assert!(items[0].contains("Message in channel news"));
    assert!(items[0].contains("From: bob"));
    assert!(items[0].contains("\n\nhi\n"));

    // Bob is subscribed too, so the broker delivered his own message
    // back to him; self-suppression must keep it out of his queue.
    let items = drain_within(&mut bob_rx, SETTLE).await;
    assert!(items.is_empty(), "sender saw its own broadcast: {:?}", items);
}

#[tokio::test]
async fn private_message_reaches_only_the_recipient() {
    let hub = MemoryBroker::new();
    let store = MemoryStore::new();

    let alice = connect(&hub, &store).await;
    let bob = connect(&hub, &store).await;
    let carol = connect(&hub, &store).await;
    let mut alice_rx = alice.take_receiver().await.unwrap();
    let mut bob_rx = bob.take_receiver().await.unwrap();
    let mut carol_rx = carol.take_receiver().await.unwrap();

    alice
        .identify("alice", UserProfile::default())
        .await
        .unwrap();
    bob.identify("bob", UserProfile::default()).await.unwrap();
    carol
        .identify("carol", UserProfile::default())
        .await
        .unwrap();

    alice.send_private("bob", "secret").await.unwrap();

    let items = drain_within(&mut bob_rx, WAIT).await;
    assert_eq!(items.len(), 1);
    assert!(items[0].contains("Private message from alice"));
    assert!(items[0].contains("secret"));

    assert!(drain_within(&mut alice_rx, SETTLE).await.is_empty());
    assert!(drain_within(&mut carol_rx, SETTLE).await.is_empty());
}

#[tokio::test]
async fn delivery_order_matches_publish_order() {
    let hub = MemoryBroker::new();
    let store = MemoryStore::new();

    let alice = connect(&hub, &store).await;
    let bob = connect(&hub, &store).await;
    let mut alice_rx = alice.take_receiver().await.unwrap();

    alice
        .identify("alice", UserProfile::default())
        .await
        .unwrap();
    bob.identify("bob", UserProfile::default()).await.unwrap();
    alice.join("news").await.unwrap();

    for i in 0..10 {
        bob.send_message("news", &format!("msg-{:02}", i))
            .await
            .unwrap();
    }

    let mut items = Vec::new();
    let start = Instant::now();
    while items.len() < 10 && start.elapsed() < WAIT {
        items.extend(drain_within(&mut alice_rx, WAIT).await);
    }

    assert_eq!(items.len(), 10);
    for (i, item) in items.iter().enumerate() {
        assert!(
            item.contains(&format!("msg-{:02}", i)),
            "out of order at {}: {}",
            i,
            item
        );
    }
}

#[tokio::test]
async fn profile_deletion_unsubscribes_and_stops_the_listener() {
    let hub = MemoryBroker::new();
    let store = MemoryStore::new();

    let alice = connect(&hub, &store).await;
    let bob = connect(&hub, &store).await;
    let mut alice_rx = alice.take_receiver().await.unwrap();

    alice
        .identify("alice", UserProfile::default())
        .await
        .unwrap();
    bob.identify("bob", UserProfile::default()).await.unwrap();
    alice.join("news").await.unwrap();

    assert!(alice.delete_profile(true).await.unwrap());
    assert!(!alice.is_listening());
    assert!(alice.username().await.is_none());

    // Give the listener a few poll intervals to observe the flag
    tokio::time::sleep(Duration::from_millis(100)).await;

    bob.send_message("news", "anyone there?").await.unwrap();
    bob.send_private("alice", "hello?").await.unwrap();

    let items = drain_within(&mut alice_rx, SETTLE).await;
    assert!(items.is_empty(), "deleted session still receives: {:?}", items);
}

#[tokio::test]
async fn malformed_payload_does_not_kill_the_listener() {
    let hub = MemoryBroker::new();
    let store = MemoryStore::new();

    let alice = connect(&hub, &store).await;
    let mut alice_rx = alice.take_receiver().await.unwrap();
    alice
        .identify("alice", UserProfile::default())
        .await
        .unwrap();
    alice.join("news").await.unwrap();

    // A raw handle publishing garbage straight to the broker
    let raw = hub.connect().await;
    raw.publish("news", "this is not an envelope").await.unwrap();
    raw.publish("news", r#"{"from":"eve","message":"still here"}"#)
        .await
        .unwrap();

    let items = drain_within(&mut alice_rx, WAIT).await;
    assert_eq!(items.len(), 1);
    assert!(items[0].contains("still here"));
}

#[tokio::test]
async fn messages_published_before_joining_are_never_seen() {
    let hub = MemoryBroker::new();
    let store = MemoryStore::new();

    let alice = connect(&hub, &store).await;
    let bob = connect(&hub, &store).await;
    let mut alice_rx = alice.take_receiver().await.unwrap();

    alice
        .identify("alice", UserProfile::default())
        .await
        .unwrap();
    bob.identify("bob", UserProfile::default()).await.unwrap();

    bob.send_message("news", "before").await.unwrap();
    alice.join("news").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    bob.send_message("news", "after").await.unwrap();

    let items = drain_within(&mut alice_rx, WAIT).await;
    assert_eq!(items.len(), 1);
    assert!(items[0].contains("after"));
}
