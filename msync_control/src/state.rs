//! Shared control state.
//!
//! One `ControlState` lives for the whole run and is shared by the poll cycle
//! and the command listener through an `Arc`.
//!
//! Locking:
//! - each channel has its own mutex, so a read and a write never overlap on
//!   the same link;
//! - the commanded speed, the sync-fault latch and the stop latch share one
//!   small mutex;
//! - the setpoint mutex may be taken while a channel is locked, never the
//!   other way round.

use crate::error::ControlError;
use msync_common::config::SyncConfig;
use msync_common::drive::DriveDriver;
use msync_drive::MotorChannel;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Number of drives under control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorMode {
    /// One drive, no divergence check.
    Single,
    /// Two drives kept in lock-step.
    Dual,
}

impl MotorMode {
    /// Channel count required by the mode.
    pub const fn channel_count(self) -> usize {
        match self {
            MotorMode::Single => 1,
            MotorMode::Dual => 2,
        }
    }
}

#[derive(Debug, Default)]
struct Setpoint {
    commanded_rpm: i32,
    sync_faulted: bool,
    stopped: bool,
}

impl Setpoint {
    fn is_halted(&self) -> bool {
        self.sync_faulted || self.stopped
    }
}

/// Channels plus the setpoint they are driven to.
pub struct ControlState {
    mode: MotorMode,
    channels: Vec<Mutex<MotorChannel>>,
    setpoint: Mutex<Setpoint>,
    running: Arc<AtomicBool>,
}

impl ControlState {
    /// Build the channels listed by `config` (all Disconnected, 0 RPM).
    ///
    /// # Errors
    /// `ControlError::ChannelCount` if the active channels do not match the
    /// configured mode.
    pub fn from_config(
        config: &SyncConfig,
        driver: Arc<dyn DriveDriver>,
        running: Arc<AtomicBool>,
    ) -> Result<Self, ControlError> {
        let mode = if config.single_motor {
            MotorMode::Single
        } else {
            MotorMode::Dual
        };

        let active = config.active_channels();
        if active.len() != mode.channel_count() {
            return Err(ControlError::ChannelCount(active.len()));
        }

        let channels = active
            .iter()
            .map(|c| Mutex::new(MotorChannel::new(&c.name, &c.address, Arc::clone(&driver))))
            .collect();

        info!(
            "Control state ready: {:?} mode, channels [{}]",
            mode,
            active
                .iter()
                .map(|c| format!("{}@{}", c.name, c.address))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            mode,
            channels,
            setpoint: Mutex::new(Setpoint::default()),
            running,
        })
    }

    /// Motor mode fixed at start-up.
    pub fn mode(&self) -> MotorMode {
        self.mode
    }

    /// Channels in report order.
    pub fn channels(&self) -> &[Mutex<MotorChannel>] {
        &self.channels
    }

    /// Current commanded speed [RPM].
    pub fn commanded_rpm(&self) -> i32 {
        self.setpoint.lock().commanded_rpm
    }

    /// Whether a sync fault has stopped the rig.
    pub fn is_sync_faulted(&self) -> bool {
        self.setpoint.lock().sync_faulted
    }

    /// Whether the drives were stopped for good, by a sync fault or by
    /// [`stop_all`](Self::stop_all).
    pub fn is_halted(&self) -> bool {
        self.setpoint.lock().is_halted()
    }

    /// Speed a channel may be driven to right now, `None` once halted.
    ///
    /// Call with the channel locked.
    pub fn live_setpoint(&self) -> Option<i32> {
        let setpoint = self.setpoint.lock();
        (!setpoint.is_halted()).then_some(setpoint.commanded_rpm)
    }

    /// Record a new commanded speed.
    ///
    /// Returns `false` (and keeps the stored value) once halted.
    pub fn store_commanded_rpm(&self, rpm: i32) -> bool {
        let mut setpoint = self.setpoint.lock();
        if setpoint.is_halted() {
            return false;
        }
        setpoint.commanded_rpm = rpm;
        true
    }

    /// Latch the sync fault and force the setpoint to 0 RPM.
    ///
    /// Returns `true` on the first call only.
    pub fn latch_sync_fault(&self) -> bool {
        let mut setpoint = self.setpoint.lock();
        let first = !setpoint.sync_faulted;
        setpoint.sync_faulted = true;
        setpoint.commanded_rpm = 0;
        first
    }

    /// Shared run flag, cleared on shutdown.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Whether the activities should keep going.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask both activities to wind down.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Command every channel to 0 RPM and drop its link.
    ///
    /// The setpoint is zeroed and frozen first, so a tick or a command still
    /// in flight cannot bring a drive back up after the sweep. Best effort: a
    /// failed stop command is logged and the link is dropped anyway.
    pub fn stop_all(&self) {
        {
            let mut setpoint = self.setpoint.lock();
            setpoint.stopped = true;
            setpoint.commanded_rpm = 0;
        }
        for slot in &self.channels {
            let mut channel = slot.lock();
            match channel.command_speed(0) {
                Ok(true) => debug!("{} stopped", channel.id()),
                Ok(false) => {}
                Err(e) => warn!("{} stop command failed: {e}", channel.id()),
            }
            channel.disconnect();
        }
    }
}

impl std::fmt::Debug for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlState")
            .field("mode", &self.mode)
            .field("channels", &self.channels.len())
            .field("setpoint", &*self.setpoint.lock())
            .field("running", &self.is_running())
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
