//! Divergence check between the two drives of a dual-motor rig.
//!
//! Computes `rev1 - rev2`, compares its magnitude to the configured
//! threshold and reports either the difference or a fault. Stateless: the
//! poll cycle owns the reaction (stop, disconnect, latch).

use msync_common::config::SyncConfig;

/// Result of one divergence evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncVerdict {
    /// Drives agree within the threshold.
    InSync {
        /// Signed difference `rev1 - rev2` [revolutions].
        difference: f64,
    },
    /// Drives diverged beyond the threshold.
    Faulted {
        /// Signed difference `rev1 - rev2` [revolutions].
        difference: f64,
    },
}

impl SyncVerdict {
    /// Signed difference carried by either variant.
    pub fn difference(&self) -> f64 {
        match *self {
            SyncVerdict::InSync { difference } | SyncVerdict::Faulted { difference } => difference,
        }
    }

    /// Whether the verdict requires stopping the rig.
    pub fn is_faulted(&self) -> bool {
        matches!(self, SyncVerdict::Faulted { .. })
    }
}

/// Threshold check plus encoder unit conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncMonitor {
    /// Maximum tolerated |rev1 - rev2| [revolutions].
    threshold: f64,
    /// Encoder resolution [ticks/revolution].
    ticks_per_revolution: u32,
}

impl SyncMonitor {
    /// Create a monitor.
    pub fn new(threshold: f64, ticks_per_revolution: u32) -> Self {
        Self {
            threshold,
            ticks_per_revolution,
        }
    }

    /// Build from the `[sync]` table.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.divergence_threshold, config.ticks_per_revolution)
    }

    /// Configured threshold [revolutions].
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Convert an absolute encoder reading to revolutions.
    #[inline]
    pub fn ticks_to_revolutions(&self, ticks: i64) -> f64 {
        ticks as f64 / f64::from(self.ticks_per_revolution)
    }

    /// Compare two positions [revolutions].
    ///
    /// Faulted iff `|rev1 - rev2| > threshold`; a difference exactly at the
    /// threshold is still in sync.
    pub fn evaluate(&self, rev1: f64, rev2: f64) -> SyncVerdict {
        let difference = rev1 - rev2;
        if difference.abs() > self.threshold {
            SyncVerdict::Faulted { difference }
        } else {
            SyncVerdict::InSync { difference }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
