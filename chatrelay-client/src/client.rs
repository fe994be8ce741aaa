//! Chat client facade
//!
//! Prompt-free API over the routing core. The CLI gathers input and
//! renders output; every operation here validates, mutates session and
//! store state, and returns typed errors. Operations that require an
//! identified session fail with `NotIdentified` and change nothing.

use crate::identity::{user_key, username_from_key, UserProfile};
use crate::listener::Listener;
use crate::subscriptions::{user_channels_key, SubscriptionManager, DIRECTORY_KEY};
use chatrelay_broker::{BrokerPtr, KvStorePtr};
use chatrelay_core::config::{ClientConfig, ReidentifyPolicy};
use chatrelay_core::{
    private_inbox, DeliveryQueue, DeliveryReceiver, Envelope, Error, ListenerFlag, Result, Session,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Key of the shared fact set
const FACTS_KEY: &str = "facts";
/// Key of the weather hash
const WEATHER_KEY: &str = "weather";

/// One user's chat session against the broker
pub struct ChatClient {
    broker: BrokerPtr,
    store: KvStorePtr,
    session: Arc<RwLock<Session>>,
    listening: ListenerFlag,
    queue: DeliveryQueue,
    subscriptions: SubscriptionManager,
    config: ClientConfig,
}

impl ChatClient {
    /// Create an anonymous client over the given collaborators
    pub fn new(broker: BrokerPtr, store: KvStorePtr, config: ClientConfig) -> Self {
        let session = Arc::new(RwLock::new(Session::new()));
        let subscriptions =
            SubscriptionManager::new(broker.clone(), store.clone(), session.clone());

        Self {
            broker,
            store,
            session,
            listening: ListenerFlag::new(),
            queue: DeliveryQueue::new(config.queue_capacity),
            subscriptions,
            config,
        }
    }

    /// Take the delivery-queue drain half (can only be called once)
    pub async fn take_receiver(&self) -> Option<DeliveryReceiver> {
        self.queue.take_receiver().await
    }

    /// Current username, if identified
    pub async fn username(&self) -> Option<String> {
        self.session.read().await.username.clone()
    }

    /// Whether the listener flag is currently set
    pub fn is_listening(&self) -> bool {
        self.listening.is_set()
    }

    async fn require_identified(&self) -> Result<String> {
        self.session
            .read()
            .await
            .username
            .clone()
            .ok_or(Error::NotIdentified)
    }

    /// Identify the session: persist the profile, subscribe the private
    /// inbox, and start the listener
    ///
    /// Behavior while already identified follows the configured
    /// `ReidentifyPolicy`: `Reject` fails with `AlreadyIdentified` and
    /// changes nothing; `Rebind` re-binds idempotently, swapping the
    /// inbox subscription when the username changes.
    pub async fn identify(&self, username: &str, profile: UserProfile) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::MissingArgument("username"));
        }

        let current = self.session.read().await.username.clone();
        if let Some(existing) = current {
            match self.config.reidentify {
                ReidentifyPolicy::Reject => return Err(Error::AlreadyIdentified(existing)),
                ReidentifyPolicy::Rebind => {
                    if existing != username {
                        // Old inbox must not keep delivering to this session
                        self.subscriptions
                            .unsubscribe(&private_inbox(&existing))
                            .await?;
                        info!(from = %existing, to = %username, "Re-binding session");
                    }
                }
            }
        }

        self.store
            .hash_set(&user_key(username), profile.to_fields(username))
            .await?;

        self.session.write().await.username = Some(username.to_string());
        self.subscriptions.subscribe_inbox(username).await?;

        // Idempotent start: only the caller that flips the flag spawns
        if self.listening.set() {
            Listener::spawn(
                self.broker.clone(),
                self.session.clone(),
                self.listening.clone(),
                self.queue.clone(),
                Duration::from_millis(self.config.poll_interval_ms),
            );
        }

        info!(%username, "Identified");
        Ok(())
    }

    /// Delete the current profile
    ///
    /// Requires explicit confirmation; returns `Ok(false)` when not
    /// confirmed, leaving everything untouched. On confirm: deletes the
    /// profile record and per-user channel set, unsubscribes everything
    /// including the private inbox, resets the session to anonymous, and
    /// clears the listening flag (the listener stops on its next poll).
    pub async fn delete_profile(&self, confirm: bool) -> Result<bool> {
        let username = self.require_identified().await?;
        if !confirm {
            return Ok(false);
        }

        self.store.delete(&user_key(&username)).await?;
        self.subscriptions.unsubscribe_all().await?;
        self.store.delete(&user_channels_key(&username)).await?;

        self.session.write().await.reset();
        self.listening.clear();

        info!(%username, "Profile deleted");
        Ok(true)
    }

    /// Join a channel (idempotent)
    pub async fn join(&self, channel: &str) -> Result<()> {
        self.require_identified().await?;
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(Error::MissingArgument("channel"));
        }
        self.subscriptions.subscribe(channel).await
    }

    /// Leave a channel (no-op when not a member)
    pub async fn leave(&self, channel: &str) -> Result<()> {
        self.require_identified().await?;
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(Error::MissingArgument("channel"));
        }
        self.subscriptions.unsubscribe(channel).await
    }

    /// Broadcast a message to a channel
    ///
    /// Publishing does not require membership. Returns whether the
    /// session is a member, so the caller can offer to join.
    pub async fn send_message(&self, channel: &str, text: &str) -> Result<bool> {
        let username = self.require_identified().await?;
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(Error::MissingArgument("channel"));
        }
        if text.trim().is_empty() {
            return Err(Error::MissingArgument("message"));
        }

        let payload = Envelope::broadcast(&username, text.trim()).encode()?;
        self.broker.publish(channel, &payload).await?;
        // Messaging a channel makes it discoverable even without joining
        self.store.set_add(DIRECTORY_KEY, channel).await?;

        Ok(self.session.read().await.channels.contains(channel))
    }

    /// Send a private message to another user's inbox
    pub async fn send_private(&self, recipient: &str, text: &str) -> Result<()> {
        let username = self.require_identified().await?;
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(Error::MissingArgument("recipient"));
        }
        if text.trim().is_empty() {
            return Err(Error::MissingArgument("message"));
        }

        let payload = Envelope::private(&username, text.trim()).encode()?;
        self.broker
            .publish(&private_inbox(recipient), &payload)
            .await?;
        Ok(())
    }

    /// The session's current subscriptions
    pub async fn list_my_channels(&self) -> Result<HashSet<String>> {
        self.require_identified().await?;
        Ok(self.subscriptions.list_channels().await)
    }

    /// Every channel known to the directory
    pub async fn list_all_channels(&self) -> Result<HashSet<String>> {
        self.subscriptions.list_directory().await
    }

    /// The current user's stored profile
    pub async fn whoami(&self) -> Result<HashMap<String, String>> {
        let username = self.require_identified().await?;
        Ok(self.store.hash_get_all(&user_key(&username)).await?)
    }

    /// Another user's stored profile; empty map when unknown
    pub async fn user_info(&self, username: &str) -> Result<HashMap<String, String>> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::MissingArgument("username"));
        }
        Ok(self.store.hash_get_all(&user_key(username)).await?)
    }

    /// All known users with their profiles, sorted by name
    pub async fn list_users(&self) -> Result<Vec<(String, HashMap<String, String>)>> {
        let keys = self.store.keys_with_prefix("user:").await?;
        let mut users = Vec::with_capacity(keys.len());

        for key in keys {
            if let Some(name) = username_from_key(&key) {
                let fields = self.store.hash_get_all(&key).await?;
                users.push((name.to_string(), fields));
            }
        }
        Ok(users)
    }

    /// Add a fact to the shared set
    pub async fn add_fact(&self, fact: &str) -> Result<()> {
        let fact = fact.trim();
        if fact.is_empty() {
            return Err(Error::MissingArgument("fact"));
        }
        Ok(self.store.set_add(FACTS_KEY, fact).await?)
    }

    /// A random fact, if any were added
    pub async fn random_fact(&self) -> Result<Option<String>> {
        Ok(self.store.set_random_member(FACTS_KEY).await?)
    }

    /// Stored weather for a city (case-insensitive lookup)
    pub async fn weather(&self, city: &str) -> Result<Option<String>> {
        let city = city.trim();
        if city.is_empty() {
            return Err(Error::MissingArgument("city"));
        }
        Ok(self
            .store
            .hash_get(WEATHER_KEY, &city.to_lowercase())
            .await?)
    }

    /// Stop the listener and release broker subscriptions
    pub async fn shutdown(&self) -> Result<()> {
        self.listening.clear();
        self.subscriptions.unsubscribe_all().await?;
        info!("Session shut down");
        Ok(())
    }
}
