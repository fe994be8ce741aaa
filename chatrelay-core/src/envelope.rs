//! Message envelope protocol
//!
//! The envelope is the wire shape exchanged over the broker: sender,
//! text, and a private flag distinguishing direct messages from channel
//! broadcasts. The `from` field is self-reported by the publisher and is
//! not tied to any session identity; nothing validates it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A chat message as published to the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender username (self-reported, untrusted)
    pub from: String,
    /// Message text content
    pub message: String,
    /// Whether this is a private message; absent on the wire means broadcast
    #[serde(default)]
    pub private: bool,
}

impl Envelope {
    /// Create a channel broadcast envelope
    pub fn broadcast(from: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            message: message.into(),
            private: false,
        }
    }

    /// Create a private message envelope
    pub fn private(from: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            message: message.into(),
            private: true,
        }
    }

    /// Serialize for publishing
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a broker payload
    ///
    /// Malformed payloads are a recoverable condition for the listener,
    /// so the serde error is folded into `MalformedEnvelope`.
    pub fn decode(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let envelope = Envelope::private("alice", "secret");
        let payload = envelope.encode().unwrap();
        let decoded = Envelope::decode(&payload).unwrap();

        assert_eq!(decoded, envelope);
        assert!(decoded.private);
    }

    #[test]
    fn test_private_defaults_to_false() {
        // Envelopes from older clients carry no "private" field
        let decoded = Envelope::decode(r#"{"from": "bob", "message": "hi"}"#).unwrap();
        assert_eq!(decoded.from, "bob");
        assert_eq!(decoded.message, "hi");
        assert!(!decoded.private);
    }

    #[test]
    fn test_decode_malformed() {
        let err = Envelope::decode("not json at all").unwrap_err();
        assert!(matches!(err, Error::MalformedEnvelope(_)));

        let err = Envelope::decode(r#"{"message": "no sender"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedEnvelope(_)));
    }
}
