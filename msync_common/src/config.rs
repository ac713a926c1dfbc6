//! Configuration loading traits and types.
//!
//! Every msync binary reads one TOML file made of a `[shared]` table common to
//! all services and service-specific tables. Missing tables fall back to
//! defaults, so an empty file is a valid dual-motor simulation setup.
//!
//! # Usage
//!
//! ```rust,no_run
//! use msync_common::config::{ConfigLoader, ConfigError, MsyncConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MsyncConfig::load(Path::new("msync.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_DIVERGENCE_THRESHOLD, DEFAULT_FATAL_COOLDOWN_S, DEFAULT_LISTENER_START_DELAY_MS,
    DEFAULT_MQTT_CLIENT_ID, DEFAULT_MQTT_HOST, DEFAULT_MQTT_KEEP_ALIVE_S, DEFAULT_MQTT_PORT,
    DEFAULT_MQTT_RECONNECT_DELAY_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RESUBSCRIBE_DELAY_MS,
    MAX_CHANNELS, SIMULATION_DRIVER, TICKS_PER_REVOLUTION,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common configuration fields shared across all msync services.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "msync-rig-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "msync".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One motor channel: a stable label and the device path of its drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Label used in logs and status notifications (e.g. `Motor1`).
    pub name: String,
    /// Hardware locator passed to the driver's `open`.
    pub address: String,
}

impl ChannelConfig {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::new("Motor1", "/dev/ttyUSB0"),
        ChannelConfig::new("Motor2", "/dev/ttyUSB1"),
    ]
}

/// Motor synchronization settings (`[sync]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Drive only the first channel; no divergence check.
    pub single_motor: bool,
    /// Channel definitions, in report order.
    pub channels: Vec<ChannelConfig>,
    /// Registered driver used to open every channel.
    pub driver: String,
    /// Poll cycle period [ms].
    pub poll_interval_ms: u64,
    /// Maximum tolerated |rev1 - rev2| [revolutions].
    pub divergence_threshold: f64,
    /// Encoder resolution [ticks/revolution].
    pub ticks_per_revolution: u32,
    /// Delay before the command listener first subscribes [ms].
    pub listener_start_delay_ms: u64,
    /// Delay before resubscribing after a bus failure [ms].
    pub resubscribe_delay_ms: u64,
    /// Cooldown before exit after a fatal failure, when not interactive [s].
    pub fatal_cooldown_s: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            single_motor: false,
            channels: default_channels(),
            driver: SIMULATION_DRIVER.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            divergence_threshold: DEFAULT_DIVERGENCE_THRESHOLD,
            ticks_per_revolution: TICKS_PER_REVOLUTION,
            listener_start_delay_ms: DEFAULT_LISTENER_START_DELAY_MS,
            resubscribe_delay_ms: DEFAULT_RESUBSCRIBE_DELAY_MS,
            fatal_cooldown_s: DEFAULT_FATAL_COOLDOWN_S,
        }
    }
}

impl SyncConfig {
    /// Channels that take part in the run: the first one in single-motor
    /// mode, all of them otherwise.
    pub fn active_channels(&self) -> &[ChannelConfig] {
        if self.single_motor {
            &self.channels[..self.channels.len().min(1)]
        } else {
            &self.channels
        }
    }

    /// Poll cycle period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Listener start-up delay.
    pub fn listener_start_delay(&self) -> Duration {
        Duration::from_millis(self.listener_start_delay_ms)
    }

    /// Resubscribe delay after a bus failure.
    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }

    /// Cooldown before a fatal exit.
    pub fn fatal_cooldown(&self) -> Duration {
        Duration::from_secs(self.fatal_cooldown_s)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - single-motor mode has no channel, dual mode does not have exactly two
    /// - a channel name or address is empty, or names are duplicated
    /// - the threshold is not a positive finite number
    /// - encoder resolution or poll interval is zero
    /// - the driver name is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.single_motor && self.channels.is_empty() {
            return Err(ConfigError::ValidationError(
                "single-motor mode requires at least one channel".to_string(),
            ));
        }
        if !self.single_motor && self.channels.len() != MAX_CHANNELS {
            return Err(ConfigError::ValidationError(format!(
                "dual-motor mode requires exactly {MAX_CHANNELS} channels, got {}",
                self.channels.len()
            )));
        }

        let mut names = HashSet::new();
        for channel in self.active_channels() {
            if channel.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "channel name cannot be empty".to_string(),
                ));
            }
            if channel.address.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "channel {} has an empty address",
                    channel.name
                )));
            }
            if !names.insert(channel.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate channel name: {}",
                    channel.name
                )));
            }
        }

        if !self.divergence_threshold.is_finite() || self.divergence_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "divergence_threshold must be a positive number, got {}",
                self.divergence_threshold
            )));
        }
        if self.ticks_per_revolution == 0 {
            return Err(ConfigError::ValidationError(
                "ticks_per_revolution cannot be zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms cannot be zero".to_string(),
            ));
        }
        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings of the built-in simulation driver (`[simulation]` table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Addresses whose `open` always fails.
    pub fail_open: Vec<String>,
}

/// Message bus backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// In-process bus; nothing outside the process can reach it.
    Local,
    /// MQTT broker connection.
    #[default]
    Mqtt,
}

impl FromStr for BusKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(BusKind::Local),
            "mqtt" => Ok(BusKind::Mqtt),
            other => Err(ConfigError::ValidationError(format!(
                "unknown bus kind: {other} (expected local or mqtt)"
            ))),
        }
    }
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusKind::Local => "local",
            BusKind::Mqtt => "mqtt",
        })
    }
}

/// Message bus settings (`[bus]` table).
///
/// # TOML Example
///
/// ```toml
/// [bus]
/// kind = "mqtt"
/// host = "broker.lan"
/// port = 1883
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Backend to use.
    pub kind: BusKind,
    /// Broker host name or address.
    pub host: String,
    /// Broker TCP port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// MQTT keep-alive interval [s].
    pub keep_alive_s: u64,
    /// Delay between broker connection attempts [ms].
    pub reconnect_delay_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            kind: BusKind::default(),
            host: DEFAULT_MQTT_HOST.to_string(),
            port: DEFAULT_MQTT_PORT,
            client_id: DEFAULT_MQTT_CLIENT_ID.to_string(),
            keep_alive_s: DEFAULT_MQTT_KEEP_ALIVE_S,
            reconnect_delay_ms: DEFAULT_MQTT_RECONNECT_DELAY_MS,
        }
    }
}

impl BusConfig {
    /// MQTT keep-alive interval.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_s)
    }

    /// Delay between broker connection attempts.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the MQTT backend is selected
    /// with an empty host or client id, a zero port, or a keep-alive below
    /// one second.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kind != BusKind::Mqtt {
            return Ok(());
        }
        if self.host.is_empty() {
            return Err(ConfigError::ValidationError(
                "bus host cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::ValidationError(
                "bus port cannot be zero".to_string(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "bus client_id cannot be empty".to_string(),
            ));
        }
        if self.keep_alive_s == 0 {
            return Err(ConfigError::ValidationError(
                "bus keep_alive_s must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete service configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "msync-rig-01"
///
/// [sync]
/// single_motor = false
/// divergence_threshold = 1.0
///
/// [[sync.channels]]
/// name = "Motor1"
/// address = "/dev/ttyUSB0"
///
/// [[sync.channels]]
/// name = "Motor2"
/// address = "/dev/ttyUSB1"
///
/// [bus]
/// kind = "mqtt"
/// host = "localhost"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MsyncConfig {
    /// Settings common to all services.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Motor synchronization settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Simulation driver settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Message bus settings.
    #[serde(default)]
    pub bus: BusConfig,
}

impl MsyncConfig {
    /// Validate every table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.sync.validate()?;
        self.bus.validate()
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
