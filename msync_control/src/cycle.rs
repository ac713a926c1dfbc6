//! Poll cycle: connect → read → check → report.
//!
//! Runs at a fixed cadence (100 ms by default). Per tick:
//! 1. every channel without a link is (re)connected at the current setpoint
//!    and its connectivity is announced; it is not read this tick;
//! 2. every connected channel is read; a failed read drops the link and is
//!    announced as a disconnect;
//! 3. dual mode with two readings → divergence check; a fault stops and
//!    disconnects both drives, latches, and announces `Motor desync`;
//! 4. otherwise the reportable position is published.
//!
//! Once the sync fault is latched, or the drives were stopped for shutdown,
//! every tick is a no-op for the rest of the run. Bus publishing happens after all channel locks are released.

use crate::state::{ControlState, MotorMode};
use crate::sync_monitor::{SyncMonitor, SyncVerdict};
use msync_bus::BusNotifier;
use msync_common::config::SyncConfig;
use msync_common::consts::{DESYNC_STATUS, DUAL_POSITION_DECIMALS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Ticks between periodic statistics log lines.
const STATS_LOG_INTERVAL: u64 = 100;

/// Overruns logged unconditionally before throttling kicks in.
const OVERRUN_LOG_FIRST: u64 = 10;

/// Throttled overrun logging period.
const OVERRUN_LOG_EVERY: u64 = 1_000;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Per-tick timing statistics.
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// Ticks executed.
    pub tick_count: u64,
    /// Ticks that took longer than the interval.
    pub overruns: u64,
    /// Duration of the last tick.
    pub last_tick: Duration,
    /// Longest tick so far.
    pub max_tick: Duration,
    /// Sum of all tick durations.
    pub total: Duration,
}

impl CycleStats {
    /// Record one tick; returns `true` if it overran `budget`.
    pub fn record(&mut self, elapsed: Duration, budget: Duration) -> bool {
        self.tick_count += 1;
        self.last_tick = elapsed;
        self.max_tick = self.max_tick.max(elapsed);
        self.total += elapsed;
        let overrun = elapsed > budget;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    /// Mean tick duration (zero before the first tick).
    pub fn avg_tick(&self) -> Duration {
        match u32::try_from(self.tick_count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.tick_count as f64),
        }
    }

    /// Whether the latest overrun deserves a warning.
    fn should_log_overrun(&self) -> bool {
        self.overruns <= OVERRUN_LOG_FIRST || self.overruns % OVERRUN_LOG_EVERY == 0
    }
}

// ─── Tick Outcome ───────────────────────────────────────────────────

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Drives stopped earlier (sync fault or shutdown); nothing was attempted.
    Halted,
    /// Not every channel produced a reading; nothing reported.
    Incomplete,
    /// Position published [revolutions, as sent].
    Reported(String),
    /// Divergence detected this tick; drives stopped.
    SyncFault {
        /// Signed difference `rev1 - rev2` [revolutions].
        difference: f64,
    },
}

/// Format the reportable position.
///
/// Single mode reports the channel's revolutions as-is; dual mode reports a
/// value already rounded to 5 decimals. Both always carry a decimal point
/// (`1.0`, never `1`) and never use exponent notation.
pub fn format_position(revolutions: f64) -> String {
    let text = revolutions.to_string();
    if text.contains('.') || !revolutions.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

/// Mean of two positions rounded to the dual-mode report precision.
pub fn dual_position(rev1: f64, rev2: f64) -> f64 {
    let scale = 10f64.powi(DUAL_POSITION_DECIMALS);
    ((rev1 + rev2) / 2.0 * scale).round() / scale
}

// ─── Poll Cycle ─────────────────────────────────────────────────────

/// Fixed-cadence connect/read/check/report loop.
pub struct PollCycle {
    state: Arc<ControlState>,
    monitor: SyncMonitor,
    notifier: BusNotifier,
    interval: Duration,
    stats: CycleStats,
}

impl PollCycle {
    /// Create a poll cycle over `state`.
    pub fn new(
        state: Arc<ControlState>,
        monitor: SyncMonitor,
        notifier: BusNotifier,
        interval: Duration,
    ) -> Self {
        Self {
            state,
            monitor,
            notifier,
            interval,
            stats: CycleStats::default(),
        }
    }

    /// Create a poll cycle using the `[sync]` table.
    pub fn from_config(config: &SyncConfig, state: Arc<ControlState>, notifier: BusNotifier) -> Self {
        Self::new(
            state,
            SyncMonitor::from_config(config),
            notifier,
            config.poll_interval(),
        )
    }

    /// Timing statistics so far.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run until the shared run flag is cleared.
    pub fn run(&mut self) {
        info!(
            "Poll cycle started ({} ms, {:?} mode)",
            self.interval.as_millis(),
            self.state.mode()
        );

        while self.state.is_running() {
            let start = Instant::now();
            self.tick();
            let elapsed = start.elapsed();

            if self.stats.record(elapsed, self.interval) && self.stats.should_log_overrun() {
                warn!(
                    "Poll tick overrun: {:?} > {:?} ({} overruns)",
                    elapsed, self.interval, self.stats.overruns
                );
            }
            if self.stats.tick_count % STATS_LOG_INTERVAL == 0 {
                debug!(
                    ticks = self.stats.tick_count,
                    overruns = self.stats.overruns,
                    avg_us = self.stats.avg_tick().as_micros() as u64,
                    max_us = self.stats.max_tick.as_micros() as u64,
                    "Poll cycle stats"
                );
            }

            if let Some(remaining) = self.interval.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }

        info!("Poll cycle stopped after {} ticks", self.stats.tick_count);
    }

    /// Execute one tick.
    pub fn tick(&self) -> TickOutcome {
        if self.state.is_halted() {
            return TickOutcome::Halted;
        }

        let mut readings = Vec::with_capacity(self.state.channels().len());
        let mut announcements = Vec::new();

        for slot in self.state.channels() {
            let mut channel = slot.lock();

            if !channel.is_connected() {
                // Setpoint read under the channel lock; see `state`.
                let Some(rpm) = self.state.live_setpoint() else {
                    return TickOutcome::Halted;
                };
                // Failure is logged by the channel and retried next tick.
                let _ = channel.connect(rpm);
                announcements.push(channel.announcement());
                readings.push(None);
                continue;
            }

            match channel.read_position() {
                Ok(ticks) => readings.push(Some(self.monitor.ticks_to_revolutions(ticks))),
                Err(_) => {
                    announcements.push(channel.announcement());
                    readings.push(None);
                }
            }
        }

        for text in &announcements {
            self.notifier.motor_status(text);
        }

        match (self.state.mode(), readings.as_slice()) {
            (MotorMode::Single, [Some(rev)]) => self.report(*rev),
            (MotorMode::Dual, [Some(rev1), Some(rev2)]) => {
                match self.monitor.evaluate(*rev1, *rev2) {
                    SyncVerdict::InSync { .. } => self.report(dual_position(*rev1, *rev2)),
                    SyncVerdict::Faulted { difference } => self.sync_fault(difference),
                }
            }
            _ => TickOutcome::Incomplete,
        }
    }

    fn report(&self, revolutions: f64) -> TickOutcome {
        let text = format_position(revolutions);
        self.notifier.position(&text);
        TickOutcome::Reported(text)
    }

    fn sync_fault(&self, difference: f64) -> TickOutcome {
        error!(
            "Motor desync: difference {difference:.5} rev exceeds {} rev, stopping all motors",
            self.monitor.threshold()
        );
        self.state.latch_sync_fault();
        self.state.stop_all();
        self.notifier.motor_status(DESYNC_STATUS);
        TickOutcome::SyncFault { difference }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
