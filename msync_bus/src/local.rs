//! In-process message bus.
//!
//! Each subscription owns an unbounded queue; `publish` fans a message out to
//! every subscription whose filter matches the topic, in publish order.
//! Taking the bus offline drops every queue sender, which the subscriptions
//! observe as `BusError::Disconnected`, the same way a lost broker
//! connection surfaces.

use crate::fanout::Fanout;
use msync_common::bus::{BusError, BusMessage, MessageBus, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// In-process publish/subscribe bus.
pub struct LocalBus {
    fanout: Fanout,
    online: AtomicBool,
}

impl LocalBus {
    /// Create an online bus with no subscribers.
    pub fn new() -> Self {
        Self {
            fanout: Fanout::default(),
            online: AtomicBool::new(true),
        }
    }

    /// Bring the bus online or take it offline.
    ///
    /// Going offline disconnects every live subscription; while offline,
    /// publish and subscribe fail.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if online {
            debug!("Local bus online");
        } else {
            let dropped = self.fanout.drop_all();
            debug!("Local bus offline, {dropped} subscriptions dropped");
        }
    }

    /// Whether the bus accepts traffic.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.fanout.len()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for LocalBus {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if !self.is_online() {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "bus offline".to_string(),
            });
        }

        trace!(topic, payload = %String::from_utf8_lossy(payload), "publish");
        self.fanout.deliver(&BusMessage::new(topic, payload));
        Ok(())
    }

    fn subscribe(&self, filter: &str) -> Result<Box<dyn Subscription>, BusError> {
        if !self.is_online() {
            return Err(BusError::Subscribe {
                filter: filter.to_string(),
                reason: "bus offline".to_string(),
            });
        }

        let subscription = self.fanout.add(filter);
        debug!("Subscribed to {filter}");
        Ok(Box::new(subscription))
    }
}
