//! Best-effort outbound publishing.
//!
//! A bus that is down degrades telemetry and status delivery but must never
//! stall or fail the control loop, so every publish error is logged and
//! swallowed here. The first failure of an outage is logged at warn, the
//! rest at debug until a publish succeeds again.

use msync_common::bus::MessageBus;
use msync_common::consts::{TOPIC_MOTOR_STATUS, TOPIC_POSITION};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Publishes position telemetry and motor status text.
#[derive(Clone)]
pub struct BusNotifier {
    bus: Arc<dyn MessageBus>,
    failing: Arc<AtomicBool>,
}

impl BusNotifier {
    /// Wrap a bus.
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the latest publish failed.
    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Relaxed)
    }

    /// Publish a connectivity or fault notification on `server/motor_status`.
    ///
    /// Returns whether the bus accepted the message.
    pub fn motor_status(&self, text: &str) -> bool {
        self.send(TOPIC_MOTOR_STATUS, text)
    }

    /// Publish a formatted position report on `server/position`.
    ///
    /// Returns whether the bus accepted the message.
    pub fn position(&self, text: &str) -> bool {
        self.send(TOPIC_POSITION, text)
    }

    fn send(&self, topic: &str, text: &str) -> bool {
        match self.bus.publish(topic, text.as_bytes()) {
            Ok(()) => {
                if self.failing.swap(false, Ordering::Relaxed) {
                    info!("Bus publishing restored");
                }
                debug!("{topic} <- {text}");
                true
            }
            Err(e) => {
                if self.failing.swap(true, Ordering::Relaxed) {
                    debug!("Dropping {topic} message '{text}': {e}");
                } else {
                    warn!("Dropping {topic} message '{text}': {e}");
                }
                false
            }
        }
    }
}
