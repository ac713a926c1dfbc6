//! msync Common Library
//!
//! Shared constants, configuration loading and the two contracts the control
//! loop is written against: the drive driver and the message bus.
//!
//! # Module Structure
//!
//! - [`consts`] - Topics, encoder resolution and timing defaults
//! - [`config`] - Configuration loading traits and types
//! - [`drive`] - `DriveDriver` / `DriveLink` traits and `DriveError`
//! - [`bus`] - `MessageBus` / `Subscription` traits and `BusError`
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use msync_common::prelude::*;
//! ```

pub mod bus;
pub mod config;
pub mod consts;
pub mod drive;
pub mod prelude;
