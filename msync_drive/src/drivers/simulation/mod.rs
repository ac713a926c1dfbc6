//! Simulation driver module.
//!
//! Software drives that integrate the commanded speed into an absolute
//! encoder position, for running the service without hardware.

mod drive;
mod driver;

pub use drive::SimulatedDrive;
pub use driver::SimulationDriver;

use msync_common::drive::DriveDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn DriveDriver> {
    Box::new(SimulationDriver::new())
}
