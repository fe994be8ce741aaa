//! Broker and storage seams for chatrelay
//!
//! This crate defines the external collaborator contracts the routing
//! core depends on: the pub/sub broker and the key-value store. It also
//! ships in-process implementations used by tests and the default local
//! deployment.

pub mod base;
pub mod memory;
pub mod store;

pub use base::{Broker, BrokerError, BrokerEvent, BrokerPtr, EventKind, Result};
pub use memory::{MemoryBroker, MemoryBrokerHandle};
pub use store::{KvStore, KvStorePtr, MemoryStore};
