//! Driver registry for drive drivers.
//!
//! Provides a `DriverRegistry` struct for registering drive driver factories
//! and instantiating the one named in the configuration. Constructed at
//! startup and passed by value; no global state.

use msync_common::config::MsyncConfig;
use msync_common::drive::{DriveDriver, DriveError, DriverFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::drivers::register_all_drivers;

/// Registry of available drive drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with every built-in driver registered.
    pub fn with_builtin() -> Result<Self, DriveError> {
        let mut registry = Self::new();
        register_all_drivers(&mut registry)?;
        Ok(registry)
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// Returns `DriveError::Config` if a driver with the same name is already
    /// registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> Result<(), DriveError> {
        if self.factories.contains_key(name) {
            return Err(DriveError::Config(format!(
                "driver '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create and initialize the driver named `name`.
    ///
    /// # Errors
    /// - `DriveError::Config` if no driver with the given name is registered.
    /// - Any error returned by the driver's `init`.
    pub fn create_driver(
        &self,
        name: &str,
        config: &MsyncConfig,
    ) -> Result<Arc<dyn DriveDriver>, DriveError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| DriveError::Config(format!("driver not found: {name}")))?;
        let mut driver = factory();
        driver.init(config)?;
        info!("Created driver: {} v{}", driver.name(), driver.version());
        Ok(Arc::from(driver))
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
