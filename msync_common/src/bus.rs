//! Message bus traits and error types.
//!
//! The bus is a topic-based publish/subscribe transport. Subscriptions take
//! MQTT-style filters: `+` matches exactly one level, a trailing `#` matches
//! the remaining levels (including none).

use std::time::Duration;
use thiserror::Error;

/// Error types for bus operations. All of them are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The connection to the bus was lost.
    #[error("Bus disconnected")]
    Disconnected,

    /// Publishing a message failed.
    #[error("Publish to {topic} failed: {reason}")]
    Publish {
        /// Topic of the failed message.
        topic: String,
        /// Transport-reported reason.
        reason: String,
    },

    /// Creating a subscription failed.
    #[error("Subscribe to {filter} failed: {reason}")]
    Subscribe {
        /// Requested topic filter.
        filter: String,
        /// Transport-reported reason.
        reason: String,
    },

    /// The transport could not be set up.
    #[error("Bus transport error: {0}")]
    Transport(String),
}

/// One message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Concrete topic the message was published on.
    pub topic: String,
    /// Raw payload. Not guaranteed to be UTF-8.
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Convenience constructor.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload as text, or `None` if it is not valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Stream of inbound messages for one topic filter.
pub trait Subscription: Send {
    /// Wait up to `timeout` for the next message.
    ///
    /// Returns `Ok(None)` on timeout and `Err(BusError::Disconnected)` once the
    /// subscription is dead; callers resubscribe after the latter.
    fn next_message(&mut self, timeout: Duration) -> Result<Option<BusMessage>, BusError>;
}

/// Topic-based publish/subscribe transport.
pub trait MessageBus: Send + Sync {
    /// Publish `payload` on `topic`.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Subscribe to every topic matching `filter`.
    fn subscribe(&self, filter: &str) -> Result<Box<dyn Subscription>, BusError>;
}

/// Check whether `topic` matches the subscription `filter`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
