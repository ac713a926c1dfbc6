//! Motor channel: one drive link and its connection lifecycle.
//!
//! ```text
//!                 connect ok
//!  Disconnected ─────────────► Connected
//!       ▲  ▲                     │   │
//!       │  │ connect failed      │   │ read failed (link dropped)
//!       │  └──── Faulted ◄───────┼───┘
//!       │                        │
//!       └────────────────────────┘
//!              disconnect()
//! ```
//!
//! The link lives inside the `Connected` state, so "link present" and
//! "status is Connected" cannot disagree. `Faulted` is only reached after the
//! link has been dropped; the poll cycle treats it like `Disconnected` and
//! reconnects from scratch on the next tick.

use msync_common::drive::{DriveDriver, DriveError, DriveLink};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Externally visible channel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No link; never connected, torn down, or the last open failed.
    Disconnected,
    /// Link open and usable.
    Connected,
    /// Link dropped after a failed position read.
    Faulted,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChannelStatus::Disconnected => "disconnected",
            ChannelStatus::Connected => "connected",
            ChannelStatus::Faulted => "faulted",
        };
        f.write_str(text)
    }
}

enum LinkState {
    Disconnected,
    Connected(Box<dyn DriveLink>),
    Faulted,
}

/// One motor drive plus its connection state.
pub struct MotorChannel {
    /// Stable label (e.g. `Motor1`).
    id: String,
    /// Device path handed to the driver on every (re)connect.
    address: String,
    /// Driver used to open the link.
    driver: Arc<dyn DriveDriver>,
    /// Current link state; owns the link while connected.
    link: LinkState,
    /// Last successful position reading, cleared whenever the link goes away.
    last_position_ticks: Option<i64>,
    /// Consecutive failed connection attempts.
    failed_connects: u32,
}

impl MotorChannel {
    /// Create a disconnected channel.
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        driver: Arc<dyn DriveDriver>,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            driver,
            link: LinkState::Disconnected,
            last_position_ticks: None,
            failed_connects: 0,
        }
    }

    /// Channel label.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hardware address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current status.
    pub fn status(&self) -> ChannelStatus {
        match self.link {
            LinkState::Disconnected => ChannelStatus::Disconnected,
            LinkState::Connected(_) => ChannelStatus::Connected,
            LinkState::Faulted => ChannelStatus::Faulted,
        }
    }

    /// Whether the channel holds an open link.
    pub fn is_connected(&self) -> bool {
        matches!(self.link, LinkState::Connected(_))
    }

    /// Last successfully read position [ticks]; `None` unless connected.
    pub fn last_position_ticks(&self) -> Option<i64> {
        self.last_position_ticks
    }

    /// Status notification text for the current state:
    /// `"<id> connected"` or `"<id> disconnected"`.
    pub fn announcement(&self) -> String {
        if self.is_connected() {
            format!("{} connected", self.id)
        } else {
            format!("{} disconnected", self.id)
        }
    }

    /// Open the link and bring the drive to `rpm`.
    ///
    /// A no-op on an already connected channel. A failed initial speed command
    /// is logged but leaves the channel connected.
    ///
    /// # Errors
    /// Returns the driver's connection error; the channel is then
    /// `Disconnected` and the caller retries on its next tick.
    pub fn connect(&mut self, rpm: i32) -> Result<(), DriveError> {
        if self.is_connected() {
            return Ok(());
        }

        match self.driver.open(&self.address) {
            Ok(link) => {
                self.link = LinkState::Connected(link);
                self.failed_connects = 0;
                info!(
                    "{} connected on {} via {}",
                    self.id,
                    self.address,
                    self.driver.name()
                );
                // Failure already logged; the channel stays connected.
                let _ = self.command_speed(rpm);
                Ok(())
            }
            Err(e) => {
                self.link = LinkState::Disconnected;
                self.last_position_ticks = None;
                self.failed_connects = self.failed_connects.saturating_add(1);
                if self.failed_connects == 1 {
                    info!("{} unavailable: {e}", self.id);
                } else {
                    debug!(
                        "{} still unavailable ({} attempts): {e}",
                        self.id, self.failed_connects
                    );
                }
                Err(e)
            }
        }
    }

    /// Read the absolute position [ticks].
    ///
    /// # Errors
    /// - `DriveError::NotConnected` if there is no link.
    /// - The driver's read error; the link is dropped and the channel becomes
    ///   `Faulted`.
    pub fn read_position(&mut self) -> Result<i64, DriveError> {
        let LinkState::Connected(link) = &mut self.link else {
            return Err(DriveError::NotConnected(self.id.clone()));
        };

        let result = link.read_absolute_position();
        match result {
            Ok(ticks) => {
                self.last_position_ticks = Some(ticks);
                Ok(ticks)
            }
            Err(e) => {
                self.link = LinkState::Faulted;
                self.last_position_ticks = None;
                warn!("{} position read failed, dropping link: {e}", self.id);
                Err(e)
            }
        }
    }

    /// Forward a speed command to the drive.
    ///
    /// Returns `Ok(true)` when the command reached the drive and `Ok(false)`
    /// when the channel has no link (nothing to do).
    ///
    /// # Errors
    /// Returns the driver's write error. The channel state is unchanged.
    pub fn command_speed(&mut self, rpm: i32) -> Result<bool, DriveError> {
        let LinkState::Connected(link) = &mut self.link else {
            debug!("{} not connected, speed {rpm} rpm deferred", self.id);
            return Ok(false);
        };

        match link.set_speed(rpm) {
            Ok(()) => {
                debug!("{} speed set to {rpm} rpm", self.id);
                Ok(true)
            }
            Err(e) => {
                warn!("{} speed command ({rpm} rpm) failed: {e}", self.id);
                Err(e)
            }
        }
    }

    /// Drop the link, if any, and return to `Disconnected`.
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            info!("{} disconnected", self.id);
        }
        self.link = LinkState::Disconnected;
        self.last_position_ticks = None;
    }
}

impl fmt::Debug for MotorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotorChannel")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("driver", &self.driver.name())
            .field("status", &self.status())
            .field("last_position_ticks", &self.last_position_ticks)
            .finish()
    }
}
