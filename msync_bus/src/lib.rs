//! # msync Bus Liaison
//!
//! Everything that talks to the message bus on behalf of the control loop.
//!
//! # Module Structure
//!
//! - [`local`] - `LocalBus`: in-process publish/subscribe with topic filters
//! - [`mqtt`] - `MqttBus`: MQTT broker connection with automatic reconnect
//! - [`notifier`] - `BusNotifier`: best-effort telemetry and status publishing
//! - [`connect`] - build the backend selected by the `[bus]` table
//!
//! # Topics
//!
//! | Topic                 | Direction | Payload                          |
//! |-----------------------|-----------|----------------------------------|
//! | `motion/set_rpm`      | inbound   | decimal speed                    |
//! | `server/position`     | outbound  | decimal revolutions              |
//! | `server/motor_status` | outbound  | connectivity / desync text       |

mod fanout;
pub mod local;
pub mod mqtt;
pub mod notifier;

pub use fanout::QueueSubscription;
pub use local::LocalBus;
pub use mqtt::MqttBus;
pub use notifier::BusNotifier;

use msync_common::bus::{BusError, MessageBus};
use msync_common::config::{BusConfig, BusKind};
use std::sync::Arc;

/// Build the bus backend selected by `config`.
///
/// # Errors
/// See [`MqttBus::connect`].
pub fn connect(config: &BusConfig) -> Result<Arc<dyn MessageBus>, BusError> {
    Ok(match config.kind {
        BusKind::Local => Arc::new(LocalBus::new()),
        BusKind::Mqtt => Arc::new(MqttBus::connect(config)?),
    })
}
