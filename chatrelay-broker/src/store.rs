//! Key-value store seam and in-memory implementation
//!
//! The client uses the store for profile hashes (`user:<name>`), the
//! global channel directory (`channel_names`), per-user channel sets
//! (`channels:<name>`), the shared fact set, and weather lookups. These
//! are plain CRUD calls with no routing logic.

use crate::base::{BrokerError, Result};
use async_trait::async_trait;
use rand::seq::IteratorRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// External key-value store contract
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Write fields into a hash record, creating it if absent
    async fn hash_set(&self, key: &str, fields: HashMap<String, String>) -> Result<()>;

    /// Read a single hash field
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Read all fields of a hash record; empty map when the key is absent
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Add a member to a set
    async fn set_add(&self, key: &str, member: &str) -> Result<()>;

    /// Remove a member from a set (no error when absent)
    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;

    /// All members of a set; empty when the key is absent
    async fn set_members(&self, key: &str) -> Result<HashSet<String>>;

    /// A uniformly random member of a set, if any
    async fn set_random_member(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key of any type
    async fn delete(&self, key: &str) -> Result<()>;

    /// All keys starting with the given prefix
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Shared store handle type
pub type KvStorePtr = Arc<dyn KvStore>;

enum StoreValue {
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

/// In-memory [`KvStore`] implementation
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, StoreValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn hash_set(&self, key: &str, fields: HashMap<String, String>) -> Result<()> {
        let mut data = self.data.write().await;
        match data
            .entry(key.to_string())
            .or_insert_with(|| StoreValue::Hash(HashMap::new()))
        {
            StoreValue::Hash(hash) => {
                hash.extend(fields);
                Ok(())
            }
            _ => Err(BrokerError::WrongType(key.to_string())),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(StoreValue::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(BrokerError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(StoreValue::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(BrokerError::WrongType(key.to_string())),
            None => Ok(HashMap::new()),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut data = self.data.write().await;
        match data
            .entry(key.to_string())
            .or_insert_with(|| StoreValue::Set(HashSet::new()))
        {
            StoreValue::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            _ => Err(BrokerError::WrongType(key.to_string())),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut data = self.data.write().await;
        match data.get_mut(key) {
            Some(StoreValue::Set(set)) => {
                set.remove(member);
                Ok(())
            }
            Some(_) => Err(BrokerError::WrongType(key.to_string())),
            None => Ok(()),
        }
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(StoreValue::Set(set)) => Ok(set.clone()),
            Some(_) => Err(BrokerError::WrongType(key.to_string())),
            None => Ok(HashSet::new()),
        }
    }

    async fn set_random_member(&self, key: &str) -> Result<Option<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(StoreValue::Set(set)) => {
                Ok(set.iter().choose(&mut rand::thread_rng()).cloned())
            }
            Some(_) => Err(BrokerError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        let mut keys: Vec<String> = data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
