//! Inbound command handling.
//!
//! Decodes `motion/set_rpm` messages and fans the new speed out to every
//! channel. Messages are handled one at a time, in arrival order.
//!
//! | Payload | Result |
//! |---|---|
//! | not UTF-8 | silently dropped |
//! | not a number, `inf`, `NaN` | logged at warn, dropped |
//! | decimal (`"150"`, `"-42.9"`) | truncated toward zero, saturated to `i32` |

use crate::state::ControlState;
use msync_common::bus::BusMessage;
use msync_common::consts::TOPIC_SET_RPM;
use msync_common::drive::DriveError;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Decoded inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// New speed for every drive [RPM].
    SetRpm(i32),
}

/// Payload that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Text is not a decimal number.
    #[error("not a number: {0:?}")]
    InvalidNumber(String),
    /// Number is infinite or NaN.
    #[error("not a finite number: {0:?}")]
    NonFinite(String),
}

/// Decode a bus message.
///
/// Returns `Ok(None)` for messages that carry no command (other topics,
/// non-UTF-8 payloads).
///
/// # Errors
/// A `motion/set_rpm` payload that is not a finite decimal number.
pub fn decode(message: &BusMessage) -> Result<Option<Command>, CommandError> {
    if message.topic != TOPIC_SET_RPM {
        return Ok(None);
    }
    let Some(text) = message.payload_str() else {
        return Ok(None);
    };
    parse_rpm(text).map(|rpm| Some(Command::SetRpm(rpm)))
}

/// Parse decimal text into whole RPM.
///
/// # Errors
/// See [`CommandError`].
pub fn parse_rpm(text: &str) -> Result<i32, CommandError> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| CommandError::InvalidNumber(trimmed.to_string()))?;
    if !value.is_finite() {
        return Err(CommandError::NonFinite(trimmed.to_string()));
    }
    // `as` truncates toward zero and saturates at the i32 bounds.
    Ok(value as i32)
}

/// What happened to one channel during a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    /// The drive accepted the speed.
    Applied,
    /// No link; the channel picks the setpoint up when it reconnects.
    Deferred,
    /// The drive rejected the write; the channel stays connected.
    Failed(DriveError),
}

/// Result of routing one speed command.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// Requested speed [RPM].
    pub rpm: i32,
    /// `false` when the sync fault is latched and the command was ignored.
    pub accepted: bool,
    /// Per-channel outcome in channel order; empty when not accepted.
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    /// Number of channels that rejected the write.
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChannelOutcome::Failed(_)))
            .count()
    }
}

/// Store `rpm` as the setpoint, then command every channel.
///
/// Every channel is attempted even if an earlier one fails. A channel
/// reached after the drives were stopped is left alone and reported as
/// deferred.
pub fn dispatch(state: &ControlState, rpm: i32) -> DispatchReport {
    if !state.store_commanded_rpm(rpm) {
        warn!("Ignoring {rpm} rpm: motors stopped");
        return DispatchReport {
            rpm,
            accepted: false,
            outcomes: Vec::new(),
        };
    }

    let outcomes = state
        .channels()
        .iter()
        .map(|slot| {
            let mut channel = slot.lock();
            if state.live_setpoint().is_none() {
                return ChannelOutcome::Deferred;
            }
            match channel.command_speed(rpm) {
                Ok(true) => ChannelOutcome::Applied,
                Ok(false) => ChannelOutcome::Deferred,
                Err(e) => ChannelOutcome::Failed(e),
            }
        })
        .collect();

    let report = DispatchReport {
        rpm,
        accepted: true,
        outcomes,
    };
    info!(
        "Speed set to {rpm} rpm ({} of {} channels failed)",
        report.failures(),
        report.outcomes.len()
    );
    report
}

/// Decode and apply one inbound message.
///
/// Returns the dispatch report when the message carried a command.
pub fn handle_message(state: &ControlState, message: &BusMessage) -> Option<DispatchReport> {
    debug!(
        topic = %message.topic,
        payload = %String::from_utf8_lossy(&message.payload),
        "Inbound message"
    );

    match decode(message) {
        Ok(Some(Command::SetRpm(rpm))) => Some(dispatch(state, rpm)),
        Ok(None) => {
            if message.topic != TOPIC_SET_RPM {
                debug!("Ignoring message on {}", message.topic);
            }
            None
        }
        Err(e) => {
            warn!("Discarding {} payload: {e}", message.topic);
            None
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
