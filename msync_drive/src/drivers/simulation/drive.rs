//! Simulated drive physics.
//!
//! The drive turns at exactly the commanded speed; position is the time
//! integral of speed, kept in fractional ticks so slow speeds still advance.

use std::time::Instant;

/// One simulated motor drive.
#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    /// Commanded speed [rpm].
    rpm: i32,
    /// Absolute position [ticks].
    position_ticks: f64,
    /// Encoder resolution [ticks/revolution].
    ticks_per_revolution: f64,
    /// Instant the position was last integrated to.
    last_update: Instant,
}

impl SimulatedDrive {
    /// Create a drive at rest at position zero.
    pub fn new(ticks_per_revolution: u32, now: Instant) -> Self {
        Self {
            rpm: 0,
            position_ticks: 0.0,
            ticks_per_revolution: f64::from(ticks_per_revolution),
            last_update: now,
        }
    }

    /// Integrate the position up to `now`.
    pub fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.position_ticks += f64::from(self.rpm) / 60.0 * dt * self.ticks_per_revolution;
        self.last_update = now;
    }

    /// Change the speed at `now`.
    pub fn set_speed(&mut self, rpm: i32, now: Instant) {
        self.advance(now);
        self.rpm = rpm;
    }

    /// Absolute position at `now` [ticks].
    pub fn position_ticks(&mut self, now: Instant) -> i64 {
        self.advance(now);
        self.position_ticks.round() as i64
    }

    /// Commanded speed [rpm].
    pub fn rpm(&self) -> i32 {
        self.rpm
    }
}
