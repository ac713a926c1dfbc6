//! MQTT broker connection.
//!
//! `MqttBus::connect` starts the `rumqttc` event loop on its own thread. The
//! loop keeps reconnecting for the life of the bus; while the broker is
//! unreachable publish and subscribe fail fast. A lost connection drops every
//! subscription, which the command listener observes as
//! `BusError::Disconnected` and answers by resubscribing once the broker is
//! back. Everything is sent at QoS 0, without retain.

use crate::fanout::Fanout;
use msync_common::bus::{BusError, BusMessage, MessageBus, Subscription};
use msync_common::config::BusConfig;
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Outstanding requests buffered between the client and the event loop.
const REQUEST_CAPACITY: usize = 64;

/// State shared with the event loop thread.
#[derive(Default)]
struct Link {
    fanout: Fanout,
    online: AtomicBool,
}

impl Link {
    fn handle(&self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                self.online.store(true, Ordering::SeqCst);
                info!("Connected to MQTT broker (session present: {})", ack.session_present);
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let message = BusMessage::new(publish.topic, publish.payload.to_vec());
                let delivered = self.fanout.deliver(&message);
                trace!(topic = %message.topic, delivered, "inbound");
            }
            _ => {}
        }
    }

    fn connection_lost(&self, reason: &dyn Display) {
        let was_online = self.online.swap(false, Ordering::SeqCst);
        let dropped = self.fanout.drop_all();
        if was_online {
            warn!("MQTT connection lost: {reason} ({dropped} subscriptions dropped)");
        } else {
            debug!("MQTT connect attempt failed: {reason}");
        }
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

fn event_loop(mut connection: Connection, link: &Link, retry: Duration) {
    for notification in connection.iter() {
        match notification {
            Ok(event) => link.handle(event),
            Err(e) => {
                link.connection_lost(&e);
                thread::sleep(retry);
            }
        }
    }
    link.connection_lost(&"client closed");
    debug!("MQTT event loop finished");
}

/// Message bus backed by an MQTT broker.
pub struct MqttBus {
    client: Client,
    link: Arc<Link>,
    endpoint: String,
}

impl MqttBus {
    /// Start connecting to the broker named by `config`.
    ///
    /// Returns as soon as the event loop runs; the broker may still be
    /// unreachable.
    ///
    /// # Errors
    /// `BusError::Transport` if the event loop thread cannot be started.
    pub fn connect(config: &BusConfig) -> Result<Self, BusError> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive());
        let (client, connection) = Client::new(options, REQUEST_CAPACITY);

        let link = Arc::new(Link::default());
        let worker = Arc::clone(&link);
        let retry = config.reconnect_delay();
        thread::Builder::new()
            .name("mqtt event loop".to_string())
            .spawn(move || event_loop(connection, &worker, retry))
            .map_err(|e| BusError::Transport(e.to_string()))?;

        let endpoint = format!("{}:{}", config.host, config.port);
        info!("MQTT bus connecting to {endpoint} as {}", config.client_id);
        Ok(Self {
            client,
            link,
            endpoint,
        })
    }

    /// Whether the broker acknowledged the current connection.
    pub fn is_online(&self) -> bool {
        self.link.is_online()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.link.fanout.len()
    }
}

impl MessageBus for MqttBus {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if !self.is_online() {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: format!("not connected to {}", self.endpoint),
            });
        }
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .map_err(|e| BusError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    fn subscribe(&self, filter: &str) -> Result<Box<dyn Subscription>, BusError> {
        if !self.is_online() {
            return Err(BusError::Subscribe {
                filter: filter.to_string(),
                reason: format!("not connected to {}", self.endpoint),
            });
        }
        self.client
            .subscribe(filter, QoS::AtMostOnce)
            .map_err(|e| BusError::Subscribe {
                filter: filter.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Subscribed to {filter} on {}", self.endpoint);
        Ok(Box::new(self.link.fanout.add(filter)))
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        // Event loop ends on its own once the client is gone.
        let _ = self.client.try_disconnect();
    }
}
