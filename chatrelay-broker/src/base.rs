//! Base traits for broker and event types

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Kind of event delivered by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A published message on a subscribed channel
    Message,
    /// Subscription acknowledgment
    Subscribed,
    /// Unsubscription acknowledgment
    Unsubscribed,
}

/// A raw event as delivered to a subscribed session
#[derive(Debug, Clone)]
pub struct BrokerEvent {
    /// Event kind; only `Message` carries a meaningful payload
    pub kind: EventKind,
    /// Channel the event was delivered on
    pub channel: String,
    /// Raw payload (envelope JSON for message events)
    pub payload: String,
}

impl BrokerEvent {
    /// Create a message event
    pub fn message(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Message,
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Create a subscription/unsubscription acknowledgment
    pub fn ack(kind: EventKind, channel: impl Into<String>) -> Self {
        Self {
            kind,
            channel: channel.into(),
            payload: String::new(),
        }
    }
}

/// Broker errors
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker connection closed: {0}")]
    Closed(String),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Wrong value type for key: {0}")]
    WrongType(String),
}

pub type Result<T> = std::result::Result<T, BrokerError>;

impl From<BrokerError> for chatrelay_core::Error {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::WrongType(key) => {
                chatrelay_core::Error::Store(format!("wrong value type for key {}", key))
            }
            other => chatrelay_core::Error::Broker(other.to_string()),
        }
    }
}

/// Session-scoped handle to a publish/subscribe broker
///
/// The contract the routing core consumes: at-least-once delivery to
/// current subscribers for messages published after subscription, no
/// history, per-handle FIFO, no cross-channel ordering guarantee.
/// Fan-out includes the publisher when it is subscribed to the channel.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Subscribe this session to a channel (idempotent)
    async fn subscribe(&self, channel: &str) -> Result<()>;

    /// Unsubscribe this session from a channel (idempotent)
    async fn unsubscribe(&self, channel: &str) -> Result<()>;

    /// Publish a payload to a channel, fire-and-forget
    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;

    /// Fetch the next event for this session's subscriptions
    ///
    /// Waits at most `timeout`; `None` means no event arrived. This is a
    /// bounded wait so callers can observe subscription changes between
    /// polls.
    async fn next_event(&self, timeout: Duration) -> Result<Option<BrokerEvent>>;
}

/// Shared broker handle type
pub type BrokerPtr = Arc<dyn Broker>;
