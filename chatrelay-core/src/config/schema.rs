//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for chatrelay
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Broker connection settings
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Client behavior settings
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Broker connection settings
///
/// The endpoint for a networked broker backend. The bundled in-process
/// broker ignores these; they are validated and surfaced by `status` so
/// a networked backend can be dropped in without a schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host
    #[serde(default = "default_broker_host")]
    pub host: String,
    /// Broker port
    #[serde(default = "default_broker_port")]
    pub port: u16,
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    6379
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
        }
    }
}

/// Policy for `identify` while the session is already identified
///
/// The original client silently re-ran identification, duplicating the
/// private-inbox subscription and overwriting the profile. Here the
/// behavior is explicit and configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReidentifyPolicy {
    /// Reject re-identification; the user must delete the profile first
    #[default]
    Reject,
    /// Idempotently re-bind the session to the new username
    Rebind,
}

/// Client behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Broker poll timeout for the listener, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Input poll timeout for the interactive loop, in milliseconds
    #[serde(default = "default_input_poll_ms")]
    pub input_poll_ms: u64,
    /// Delivery queue capacity (backpressure bound)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// What to do when identify is called while already identified
    #[serde(default)]
    pub reidentify: ReidentifyPolicy,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_input_poll_ms() -> u64 {
    100
}

fn default_queue_capacity() -> usize {
    crate::queue::DEFAULT_QUEUE_CAPACITY
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            input_poll_ms: default_input_poll_ms(),
            queue_capacity: default_queue_capacity(),
            reidentify: ReidentifyPolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for log files; empty disables the file layer
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
