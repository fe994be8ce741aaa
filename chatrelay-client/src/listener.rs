//! Background listener
//!
//! Continuously pulls broker events for the session's current
//! subscriptions and turns each into at most one rendered delivery line.
//! Runs until the listening flag is cleared; stop is cooperative within
//! one poll interval.

use chatrelay_broker::{BrokerPtr, EventKind};
use chatrelay_core::{DeliveryQueue, Envelope, Error, ListenerFlag, Result, Session};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receipt-time format used in rendered lines
const TIME_FORMAT: &str = "%I:%M:%S %p";

/// Brief yield between empty polls so the subscription set stays fresh
/// without burning a core
const IDLE_BACKOFF: Duration = Duration::from_micros(500);

/// Classify a message payload into zero or one rendered delivery line
///
/// Returns `Ok(None)` when the sender is the session's own user: the
/// broker fans published messages back to the publisher, and a client
/// must never display its own message as received mail. Malformed
/// payloads fail with `MalformedEnvelope` and are handled by the caller.
pub fn classify(
    channel: &str,
    payload: &str,
    current_user: Option<&str>,
    timestamp: &str,
) -> Result<Option<String>> {
    let envelope = Envelope::decode(payload)?;

    if Some(envelope.from.as_str()) == current_user {
        return Ok(None);
    }

    let line = if envelope.private {
        format!(
            "\n{} -- Private message from {}:\n{}\n",
            timestamp, envelope.from, envelope.message
        )
    } else {
        format!(
            "\n{} -- Message in channel {}\nFrom: {}\n\n{}\n",
            timestamp, channel, envelope.from, envelope.message
        )
    };
    Ok(Some(line))
}

/// The background ingest task
pub struct Listener;

impl Listener {
    /// Spawn the listener task
    ///
    /// Callers guard against double-start with [`ListenerFlag::set`];
    /// exactly one listener runs per session lifetime. The flag is
    /// cleared whenever the task exits, including on broker failure or
    /// queue closure, so a set flag always means a live listener.
    pub fn spawn(
        broker: BrokerPtr,
        session: Arc<RwLock<Session>>,
        listening: ListenerFlag,
        queue: DeliveryQueue,
        poll_timeout: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("Listener started");

            while listening.is_set() {
                match broker.next_event(poll_timeout).await {
                    Ok(Some(event)) => {
                        if event.kind != EventKind::Message {
                            continue;
                        }

                        let current_user = session.read().await.username.clone();
                        let stamp = Local::now().format(TIME_FORMAT).to_string();

                        match classify(
                            &event.channel,
                            &event.payload,
                            current_user.as_deref(),
                            &stamp,
                        ) {
                            Ok(Some(line)) => {
                                if queue.push(line).await.is_err() {
                                    debug!("Delivery queue closed; listener exiting");
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(Error::MalformedEnvelope(reason)) => {
                                debug!(channel = %event.channel, %reason, "Discarded malformed envelope");
                            }
                            Err(e) => {
                                debug!(channel = %event.channel, error = %e, "Discarded event");
                            }
                        }
                    }
                    Ok(None) => {
                        tokio::time::sleep(IDLE_BACKOFF).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Broker poll failed; listener exiting");
                        break;
                    }
                }
            }

            listening.clear();
            debug!("Listener stopped");
        })
    }
}
