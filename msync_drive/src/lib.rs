//! # msync Drive Library
//!
//! Motor channels and the pluggable driver architecture behind them.
//! Drivers implement the `DriveDriver` trait defined in `msync_common::drive`.
//!
//! # Module Structure
//!
//! - [`channel`] - `MotorChannel`: one drive link and its lifecycle state
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Built-in driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    msync_drive                               │
//! │  ┌──────────────┐    ┌──────────────┐    ┌────────────────┐  │
//! │  │ MotorChannel │───►│ DriveDriver  │◄───│ DriverRegistry │  │
//! │  │ (state+link) │    │ (trait obj)  │    │                │  │
//! │  └──────┬───────┘    └──────┬───────┘    └────────────────┘  │
//! │         │ owns              │ opens                          │
//! │         ▼                   ▼                                │
//! │  ┌──────────────────────────────┐                            │
//! │  │   DriveLink (trait object)   │                            │
//! │  └──────────────────────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod channel;
pub mod driver_registry;
pub mod drivers;

// Re-export key types for convenience
pub use crate::channel::{ChannelStatus, MotorChannel};
pub use crate::driver_registry::DriverRegistry;
