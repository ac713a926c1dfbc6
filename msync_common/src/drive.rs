//! Drive driver traits and error types.
//!
//! This module defines:
//! - `DriveDriver` trait - opens links to motor drives by address
//! - `DriveLink` trait - one open connection to a drive
//! - `DriveError` enum - connection, read and write failures
//! - `DriverFactory` type alias - factory function type
//!
//! The wire protocol of a concrete drive lives behind these traits; the
//! control loop only ever sees speeds in RPM and absolute positions in
//! encoder ticks.

use crate::config::MsyncConfig;
use thiserror::Error;

/// Error types for drive operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriveError {
    /// Opening the link failed. Recoverable: retried every poll tick.
    #[error("Connection to {address} failed: {reason}")]
    Connection {
        /// Address that could not be opened.
        address: String,
        /// Driver-reported reason.
        reason: String,
    },

    /// Reading the absolute position failed. The channel drops its link.
    #[error("Position read failed: {0}")]
    Read(String),

    /// Writing a speed command failed. Non-fatal to the channel.
    #[error("Speed command failed: {0}")]
    Write(String),

    /// The channel has no open link.
    #[error("Channel {0} is not connected")]
    NotConnected(String),

    /// Driver configuration error.
    #[error("Driver configuration error: {0}")]
    Config(String),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn DriveDriver>;

/// One open connection to a motor drive.
///
/// A link is exclusively owned by a single motor channel; callers never share
/// it between threads without the channel's lock.
pub trait DriveLink: Send {
    /// Command the drive to turn at `rpm`.
    fn set_speed(&mut self, rpm: i32) -> Result<(), DriveError>;

    /// Read the absolute encoder position [ticks].
    fn read_absolute_position(&mut self) -> Result<i64, DriveError>;
}

/// Trait defining the interface for drive drivers.
///
/// # Lifecycle
///
/// 1. `init()` - Called once after construction with the service config
/// 2. `open()` - Called by a motor channel whenever it (re)connects
pub trait DriveDriver: Send + Sync {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Apply driver-specific configuration.
    ///
    /// Default implementation does nothing.
    fn init(&mut self, _config: &MsyncConfig) -> Result<(), DriveError> {
        Ok(())
    }

    /// Open a link to the drive at `address`.
    ///
    /// # Errors
    /// Returns `DriveError::Connection` if the drive cannot be reached.
    fn open(&self, address: &str) -> Result<Box<dyn DriveLink>, DriveError>;
}
