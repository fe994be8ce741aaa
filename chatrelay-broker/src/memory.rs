//! In-process broker implementation
//!
//! A single `MemoryBroker` hub fans published messages out to every
//! connected handle subscribed to the channel, including the publisher.
//! Each handle owns a private unbounded event queue, so delivery is FIFO
//! per handle. No history is kept: messages published before a
//! subscription are never seen.

use crate::base::{Broker, BrokerError, BrokerEvent, EventKind, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;

#[derive(Default)]
struct HubState {
    clients: HashMap<u64, ClientEntry>,
}

struct ClientEntry {
    tx: mpsc::UnboundedSender<BrokerEvent>,
    channels: HashSet<String>,
}

/// In-process pub/sub hub
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<RwLock<HubState>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryBroker {
    /// Create a new hub with no connected sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new session-scoped handle
    pub async fn connect(&self) -> MemoryBrokerHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.state.write().await;
        state.clients.insert(
            id,
            ClientEntry {
                tx,
                channels: HashSet::new(),
            },
        );
        debug!(client = id, "Broker client connected");

        MemoryBrokerHandle {
            id,
            state: self.state.clone(),
            rx: Mutex::new(rx),
        }
    }

    /// Number of currently connected handles
    pub async fn client_count(&self) -> usize {
        self.state.read().await.clients.len()
    }
}

/// Session-scoped handle to a [`MemoryBroker`]
pub struct MemoryBrokerHandle {
    id: u64,
    state: Arc<RwLock<HubState>>,
    rx: Mutex<mpsc::UnboundedReceiver<BrokerEvent>>,
}

#[async_trait]
impl Broker for MemoryBrokerHandle {
    async fn subscribe(&self, channel: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state
            .clients
            .get_mut(&self.id)
            .ok_or_else(|| BrokerError::NotConnected(format!("client {}", self.id)))?;

        entry.channels.insert(channel.to_string());
        // The broker acks every subscribe, repeated or not
        let _ = entry.tx.send(BrokerEvent::ack(EventKind::Subscribed, channel));
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state
            .clients
            .get_mut(&self.id)
            .ok_or_else(|| BrokerError::NotConnected(format!("client {}", self.id)))?;

        entry.channels.remove(channel);
        let _ = entry
            .tx
            .send(BrokerEvent::ack(EventKind::Unsubscribed, channel));
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut dead = Vec::new();
        {
            let state = self.state.read().await;
            for (id, entry) in &state.clients {
                if entry.channels.contains(channel)
                    && entry
                        .tx
                        .send(BrokerEvent::message(channel, payload))
                        .is_err()
                {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut state = self.state.write().await;
            for id in dead {
                state.clients.remove(&id);
                debug!(client = id, "Removed disconnected broker client");
            }
        }
        Ok(())
    }

    async fn next_event(&self, timeout: Duration) -> Result<Option<BrokerEvent>> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(BrokerError::Closed(format!("client {}", self.id))),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(50);

    async fn next_message(handle: &MemoryBrokerHandle) -> Option<BrokerEvent> {
        // Skip over subscription acks
        while let Some(event) = handle.next_event(POLL).await.unwrap() {
            if event.kind == EventKind::Message {
                return Some(event);
            }
        }
        None
    }

    #[tokio::test]
    async fn test_fan_out_includes_publisher() {
        let hub = MemoryBroker::new();
        let a = hub.connect().await;
        let b = hub.connect().await;

        a.subscribe("news").await.unwrap();
        b.subscribe("news").await.unwrap();

        a.publish("news", "hello").await.unwrap();

        let got_a = next_message(&a).await.unwrap();
        let got_b = next_message(&b).await.unwrap();
        assert_eq!(got_a.payload, "hello");
        assert_eq!(got_b.payload, "hello");
        assert_eq!(got_b.channel, "news");
    }

    #[tokio::test]
    async fn test_no_delivery_without_subscription() {
        let hub = MemoryBroker::new();
        let a = hub.connect().await;
        let b = hub.connect().await;

        a.subscribe("news").await.unwrap();
        a.publish("other", "nope").await.unwrap();

        assert!(next_message(&a).await.is_none());
        assert!(next_message(&b).await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let hub = MemoryBroker::new();
        let a = hub.connect().await;
        let b = hub.connect().await;

        b.subscribe("news").await.unwrap();
        b.unsubscribe("news").await.unwrap();
        a.publish("news", "late").await.unwrap();

        assert!(next_message(&b).await.is_none());
    }

    #[tokio::test]
    async fn test_per_handle_fifo() {
        let hub = MemoryBroker::new();
        let a = hub.connect().await;
        let b = hub.connect().await;

        b.subscribe("news").await.unwrap();
        for i in 0..10 {
            a.publish("news", &format!("m{}", i)).await.unwrap();
        }

        for i in 0..10 {
            let event = next_message(&b).await.unwrap();
            assert_eq!(event.payload, format!("m{}", i));
        }
    }

    #[tokio::test]
    async fn test_subscribe_ack_is_not_a_message() {
        let hub = MemoryBroker::new();
        let a = hub.connect().await;

        a.subscribe("news").await.unwrap();
        let event = a.next_event(POLL).await.unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Subscribed);
        assert_eq!(event.channel, "news");
    }

    #[tokio::test]
    async fn test_timeout_yields_none() {
        let hub = MemoryBroker::new();
        let a = hub.connect().await;

        let got = a.next_event(Duration::from_millis(10)).await.unwrap();
        assert!(got.is_none());
    }
}
