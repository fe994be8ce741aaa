//! Message routing core for chatrelay
//!
//! Ties the broker seam to the session: subscription management, the
//! background listener that classifies broker events into delivery
//! lines, the identity lifecycle, and the `ChatClient` facade that
//! command handlers drive.

pub mod client;
pub mod identity;
pub mod listener;
pub mod subscriptions;

pub use client::ChatClient;
pub use identity::UserProfile;
pub use listener::Listener;
pub use subscriptions::SubscriptionManager;
