//! Control-level errors.
//!
//! Drive and bus failures are contained by the channel and the notifier;
//! what reaches this type is either a start-up problem or an activity that
//! stopped running, both of which end the process.

use msync_common::bus::BusError;
use msync_common::config::ConfigError;
use msync_common::drive::DriveError;
use thiserror::Error;

/// Errors that end a control activity or prevent start-up.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Driver could not be created.
    #[error("drive error: {0}")]
    Drive(#[from] DriveError),

    /// Bus error escaping an activity.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// The channel count does not match a supported mode.
    #[error("unsupported channel count {0} (expected 1 or 2)")]
    ChannelCount(usize),

    /// An activity thread could not be started.
    #[error("failed to spawn {activity}: {source}")]
    Spawn {
        /// Activity name.
        activity: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// An activity panicked.
    #[error("{activity} panicked: {message}")]
    ActivityPanicked {
        /// Activity name.
        activity: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// An activity returned while the service was still meant to run.
    #[error("{0} stopped unexpectedly")]
    ActivityStopped(&'static str),
}
