//! Error types for chatrelay

use thiserror::Error;

/// The main error type for chatrelay operations
#[derive(Error, Debug)]
pub enum Error {
    /// A command that requires an identified session was invoked while anonymous
    #[error("Not identified. Identify yourself first (option 1).")]
    NotIdentified,

    /// Re-identification attempted while already identified (reject policy)
    #[error("Already identified as {0}. Delete your profile before re-identifying.")]
    AlreadyIdentified(String),

    /// Broker payload that could not be decoded into an envelope
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Unrecognized user input
    #[error("Unknown command: {0}. Type !help for a list of commands.")]
    UnknownCommand(String),

    /// Command invoked without a required argument
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// Broker communication errors
    #[error("Broker error: {0}")]
    Broker(String),

    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A specialized Result type for chatrelay operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Whether this error is recoverable by showing the user a hint,
    /// leaving the session untouched
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::NotIdentified
                | Error::AlreadyIdentified(_)
                | Error::UnknownCommand(_)
                | Error::MissingArgument(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownCommand("!frobnicate".to_string());
        assert!(err.to_string().contains("!frobnicate"));

        let err = Error::MissingArgument("city");
        assert_eq!(err.to_string(), "Missing argument: city");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(Error::NotIdentified.is_user_error());
        assert!(Error::MissingArgument("fact").is_user_error());
        assert!(!Error::Broker("connection reset".to_string()).is_user_error());
        assert!(!Error::MalformedEnvelope("bad json".to_string()).is_user_error());
    }
}
