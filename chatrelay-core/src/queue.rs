//! Delivery queue bridging the listener and the interactive loop
//!
//! A bounded FIFO hand-off between the background listener (producer)
//! and the interactive loop (consumer). The original design placed no
//! bound on queue depth; this one is bounded with blocking backpressure:
//! a full queue makes the producer await instead of dropping items, so
//! FIFO order and no-drop delivery are preserved while memory stays
//! bounded.

use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Default queue capacity when the config does not override it
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Bounded FIFO queue of rendered delivery lines
///
/// Clonable producer handle; the consumer takes the receiver exactly once.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<String>,
    rx: Arc<RwLock<Option<mpsc::Receiver<String>>>>,
}

impl DeliveryQueue {
    /// Create a new delivery queue with the given capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Arc::new(RwLock::new(Some(rx))),
        }
    }

    /// Push a rendered line onto the queue
    ///
    /// Awaits when the queue is full; errors only if the consumer side
    /// has been dropped.
    pub async fn push(&self, item: impl Into<String>) -> Result<()> {
        self.tx
            .send(item.into())
            .await
            .map_err(|_| Error::Broker("Delivery queue closed".to_string()))
    }

    /// Take the receiving half (can only be called once)
    pub async fn take_receiver(&self) -> Option<DeliveryReceiver> {
        let rx = self.rx.write().await.take();
        if rx.is_none() {
            debug!("Delivery receiver already taken");
        }
        rx.map(|rx| DeliveryReceiver { rx })
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Consuming half of the delivery queue
pub struct DeliveryReceiver {
    rx: mpsc::Receiver<String>,
}

impl DeliveryReceiver {
    /// Drain every currently queued item, in arrival order
    ///
    /// Never blocks: an empty queue yields an empty vec.
    pub fn drain(&mut self) -> Vec<String> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = DeliveryQueue::new(16);
        let mut receiver = queue.take_receiver().await.unwrap();

        for i in 0..5 {
            queue.push(format!("line {}", i)).await.unwrap();
        }

        let items = receiver.drain();
        assert_eq!(items.len(), 5);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item, &format!("line {}", i));
        }
    }

    #[tokio::test]
    async fn test_drain_empty_is_noop() {
        let queue = DeliveryQueue::new(16);
        let mut receiver = queue.take_receiver().await.unwrap();
        assert!(receiver.drain().is_empty());
    }

    #[tokio::test]
    async fn test_receiver_taken_once() {
        let queue = DeliveryQueue::new(16);
        assert!(queue.take_receiver().await.is_some());
        assert!(queue.take_receiver().await.is_none());
    }

    #[tokio::test]
    async fn test_backpressure_releases_on_drain() {
        let queue = DeliveryQueue::new(2);
        let mut receiver = queue.take_receiver().await.unwrap();

        queue.push("a").await.unwrap();
        queue.push("b").await.unwrap();

        // Queue is full; a third push must wait until the consumer drains.
        let producer = queue.clone();
        let pending = tokio::spawn(async move { producer.push("c").await });

        tokio::task::yield_now().await;
        let first = receiver.drain();
        assert_eq!(first, vec!["a".to_string(), "b".to_string()]);

        pending.await.unwrap().unwrap();
        assert_eq!(receiver.drain(), vec!["c".to_string()]);
    }
}
