//! Drive driver implementations.
//!
//! - [`simulation`] - Software drives for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `DriveDriver` and `DriveLink` from `msync_common::drive`
//! 3. Register the factory in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use msync_common::consts::SIMULATION_DRIVER;
use msync_common::drive::DriveError;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) -> Result<(), DriveError> {
    registry.register(SIMULATION_DRIVER, simulation::create_driver)?;
    Ok(())
}
