//! Core types for chatrelay
//!
//! This crate provides the foundational types shared by all other
//! chatrelay components: the message envelope, the delivery queue,
//! session state, configuration, and error handling.

pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod queue;
pub mod session;

pub use envelope::Envelope;
pub use error::{Error, Result};
pub use queue::{DeliveryQueue, DeliveryReceiver};
pub use session::{private_inbox, ListenerFlag, Session};
