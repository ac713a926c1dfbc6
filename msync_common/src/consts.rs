//! System-wide constants for the msync workspace.
//!
//! Single source of truth for topics, encoder resolution and timing defaults.

/// Inbound topic carrying the commanded speed for all channels.
pub const TOPIC_SET_RPM: &str = "motion/set_rpm";

/// Subscription filter used by the command listener.
pub const TOPIC_MOTION_FILTER: &str = "motion/#";

/// Outbound topic carrying the reported position [revolutions].
pub const TOPIC_POSITION: &str = "server/position";

/// Outbound topic carrying connectivity and fault notifications.
pub const TOPIC_MOTOR_STATUS: &str = "server/motor_status";

/// Status text announced when the two channels diverge.
pub const DESYNC_STATUS: &str = "Motor desync";

/// Encoder resolution of the drives [ticks/revolution].
pub const TICKS_PER_REVOLUTION: u32 = 65_536;

/// Maximum number of synchronized channels.
pub const MAX_CHANNELS: usize = 2;

/// Default poll cycle period [ms].
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default divergence threshold [revolutions].
pub const DEFAULT_DIVERGENCE_THRESHOLD: f64 = 1.0;

/// Delay before the command listener first subscribes [ms].
pub const DEFAULT_LISTENER_START_DELAY_MS: u64 = 1_000;

/// Delay between a lost bus subscription and the next attempt [ms].
pub const DEFAULT_RESUBSCRIBE_DELAY_MS: u64 = 5_000;

/// Cooldown before exiting after a fatal activity failure [s].
pub const DEFAULT_FATAL_COOLDOWN_S: u64 = 60;

/// Decimal places of the dual-channel position report.
pub const DUAL_POSITION_DECIMALS: i32 = 5;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/msync/msync.toml";

/// Name of the built-in simulation driver.
pub const SIMULATION_DRIVER: &str = "simulation";

/// Default MQTT broker host.
pub const DEFAULT_MQTT_HOST: &str = "localhost";

/// Default MQTT broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default MQTT client identifier.
pub const DEFAULT_MQTT_CLIENT_ID: &str = "msync";

/// Default MQTT keep-alive interval [s].
pub const DEFAULT_MQTT_KEEP_ALIVE_S: u64 = 5;

/// Delay between MQTT connection attempts [ms].
pub const DEFAULT_MQTT_RECONNECT_DELAY_MS: u64 = 1_000;
