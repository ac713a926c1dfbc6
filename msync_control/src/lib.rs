//! # msync Control Library
//!
//! Keeps one or two motor drives turning in lock-step under a single commanded
//! speed, reports their position over the message bus, and stops both drives
//! for good when they fall out of mechanical synchronization.
//!
//! ## Activities
//!
//! 1. **Poll cycle** ([`cycle`]): every 100 ms (re)connects channels, reads
//!    positions, checks divergence ([`sync_monitor`]) and publishes telemetry.
//! 2. **Command listener** ([`listener`]): blocks on the bus subscription and
//!    applies each `motion/set_rpm` message ([`command`]) to every channel.
//!
//! Both share one [`state::ControlState`]. The [`supervisor`] runs them on
//! dedicated threads and turns the unexpected end of either into a fatal
//! process exit.

pub mod command;
pub mod cycle;
pub mod error;
pub mod listener;
pub mod state;
pub mod supervisor;
pub mod sync_monitor;
