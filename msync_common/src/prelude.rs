//! Prelude module for common re-exports.
//!
//! ```rust
//! use msync_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    BusConfig, BusKind, ChannelConfig, ConfigError, ConfigLoader, LogLevel, MsyncConfig,
    SharedConfig, SimulationConfig, SyncConfig,
};

// ─── Drive contract ─────────────────────────────────────────────────
pub use crate::drive::{DriveDriver, DriveError, DriveLink, DriverFactory};

// ─── Bus contract ───────────────────────────────────────────────────
pub use crate::bus::{BusError, BusMessage, MessageBus, Subscription, topic_matches};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{
    DESYNC_STATUS, TICKS_PER_REVOLUTION, TOPIC_MOTION_FILTER, TOPIC_MOTOR_STATUS,
    TOPIC_POSITION, TOPIC_SET_RPM,
};
