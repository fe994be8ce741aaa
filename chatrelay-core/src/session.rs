//! Session identity and subscription state
//!
//! A session tracks the current username (or none, while anonymous) and
//! the set of channels it is subscribed to. It is shared between the
//! interactive loop, which mutates it through command handlers, and the
//! listener, which reads it on every poll.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Derive a user's implicit private inbox channel name
///
/// Every identified session is subscribed to exactly its own inbox while
/// identified. The format is part of the wire contract between clients.
pub fn private_inbox(username: &str) -> String {
    format!("{} private inbox", username)
}

/// The current session's identity and subscription state
#[derive(Debug, Default)]
pub struct Session {
    /// Current username; `None` while anonymous
    pub username: Option<String>,
    /// Channels this session is currently subscribed to
    pub channels: HashSet<String>,
}

impl Session {
    /// Create a new anonymous session
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session is identified
    pub fn is_identified(&self) -> bool {
        self.username.is_some()
    }

    /// The session's private inbox channel, if identified
    pub fn inbox(&self) -> Option<String> {
        self.username.as_deref().map(private_inbox)
    }

    /// Reset to anonymous, clearing all subscriptions
    pub fn reset(&mut self) {
        self.username = None;
        self.channels.clear();
    }
}

/// Shared run flag read by the listener on every poll
///
/// Cleared by profile deletion or shutdown, and by the listener itself
/// when its task exits; the listener observes an external clear within
/// one poll interval. Stop is cooperative, not preemptive.
#[derive(Debug, Clone, Default)]
pub struct ListenerFlag(Arc<AtomicBool>);

impl ListenerFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Set the flag, returning whether it was previously clear
    ///
    /// Used to make listener startup idempotent: only the caller that
    /// flips the flag spawns the task.
    pub fn set(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}
