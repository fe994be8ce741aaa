//! Subscription management
//!
//! Owns the channel membership of one session: broker subscribe plus
//! session-set bookkeeping plus the global channel directory. The
//! directory (`channel_names`) is a discovery view only, best-effort and
//! eventually consistent; delivery is driven purely by broker
//! subscriptions.

use chatrelay_broker::{BrokerPtr, KvStorePtr};
use chatrelay_core::{private_inbox, Result, Session};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Key of the global channel directory set
pub const DIRECTORY_KEY: &str = "channel_names";

/// Key of a user's persisted channel set
pub fn user_channels_key(username: &str) -> String {
    format!("channels:{}", username)
}

/// Coordinates broker subscriptions with session and directory state
#[derive(Clone)]
pub struct SubscriptionManager {
    broker: BrokerPtr,
    store: KvStorePtr,
    session: Arc<RwLock<Session>>,
}

impl SubscriptionManager {
    pub fn new(broker: BrokerPtr, store: KvStorePtr, session: Arc<RwLock<Session>>) -> Self {
        Self {
            broker,
            store,
            session,
        }
    }

    /// Join a channel: broker subscribe, session set, per-user set,
    /// global directory. Idempotent; joining twice is the same as once.
    pub async fn subscribe(&self, channel: &str) -> Result<()> {
        self.broker.subscribe(channel).await?;

        let username = {
            let mut session = self.session.write().await;
            session.channels.insert(channel.to_string());
            session.username.clone()
        };

        if let Some(user) = username {
            self.store
                .set_add(&user_channels_key(&user), channel)
                .await?;
        }
        self.store.set_add(DIRECTORY_KEY, channel).await?;

        debug!(channel, "Subscribed");
        Ok(())
    }

    /// Subscribe the session to a user's private inbox
    ///
    /// Inboxes are not advertised in the global directory.
    pub async fn subscribe_inbox(&self, username: &str) -> Result<String> {
        let inbox = private_inbox(username);
        self.broker.subscribe(&inbox).await?;

        {
            let mut session = self.session.write().await;
            session.channels.insert(inbox.clone());
        }
        self.store
            .set_add(&user_channels_key(username), &inbox)
            .await?;

        debug!(channel = %inbox, "Subscribed to private inbox");
        Ok(inbox)
    }

    /// Leave a channel. Leaving a channel the session is not in is a
    /// no-op, not an error.
    pub async fn unsubscribe(&self, channel: &str) -> Result<()> {
        self.broker.unsubscribe(channel).await?;

        let username = {
            let mut session = self.session.write().await;
            session.channels.remove(channel);
            session.username.clone()
        };

        if let Some(user) = username {
            self.store
                .set_remove(&user_channels_key(&user), channel)
                .await?;
        }

        debug!(channel, "Unsubscribed");
        Ok(())
    }

    /// Unsubscribe from every channel the session is in and clear the
    /// session set
    pub async fn unsubscribe_all(&self) -> Result<()> {
        let channels: Vec<String> = {
            let session = self.session.read().await;
            session.channels.iter().cloned().collect()
        };

        for channel in &channels {
            self.broker.unsubscribe(channel).await?;
        }

        self.session.write().await.channels.clear();
        debug!(count = channels.len(), "Unsubscribed from all channels");
        Ok(())
    }

    /// Membership view: the session's current subscriptions
    pub async fn list_channels(&self) -> HashSet<String> {
        self.session.read().await.channels.clone()
    }

    /// Discovery view: every channel any user ever joined or messaged
    pub async fn list_directory(&self) -> Result<HashSet<String>> {
        Ok(self.store.set_members(DIRECTORY_KEY).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_broker::{MemoryBroker, MemoryStore};

    async fn manager() -> SubscriptionManager {
        let hub = MemoryBroker::new();
        let broker: BrokerPtr = Arc::new(hub.connect().await);
        let store: KvStorePtr = Arc::new(MemoryStore::new());
        let session = Arc::new(RwLock::new(Session::new()));
        SubscriptionManager::new(broker, store, session)
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let manager = manager().await;

        manager.subscribe("news").await.unwrap();
        manager.subscribe("news").await.unwrap();

        let channels = manager.list_channels().await;
        assert_eq!(channels.len(), 1);
        assert!(channels.contains("news"));
    }

    #[tokio::test]
    async fn test_unsubscribe_non_member_is_noop() {
        let manager = manager().await;

        manager.unsubscribe("never-joined").await.unwrap();
        assert!(manager.list_channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_membership_and_directory_are_distinct() {
        let manager = manager().await;

        manager.subscribe("news").await.unwrap();
        manager.subscribe("random").await.unwrap();
        manager.unsubscribe("random").await.unwrap();

        // Membership reflects current subscriptions only
        let channels = manager.list_channels().await;
        assert_eq!(channels.len(), 1);

        // The directory remembers every channel ever joined
        let directory = manager.list_directory().await.unwrap();
        assert!(directory.contains("news"));
        assert!(directory.contains("random"));
    }

    #[tokio::test]
    async fn test_inbox_not_in_directory() {
        let manager = manager().await;
        manager.session.write().await.username = Some("alice".to_string());

        let inbox = manager.subscribe_inbox("alice").await.unwrap();
        assert_eq!(inbox, "alice private inbox");

        assert!(manager.list_channels().await.contains(&inbox));
        assert!(!manager.list_directory().await.unwrap().contains(&inbox));
    }

    #[tokio::test]
    async fn test_unsubscribe_all_clears_session() {
        let manager = manager().await;

        manager.subscribe("a").await.unwrap();
        manager.subscribe("b").await.unwrap();
        manager.unsubscribe_all().await.unwrap();

        assert!(manager.list_channels().await.is_empty());
    }
}
