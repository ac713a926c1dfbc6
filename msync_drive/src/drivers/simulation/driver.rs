//! Simulation driver implementation.
//!
//! `SimulationDriver` implements `DriveDriver` with one `SimulatedDrive` per
//! address. Drive state outlives the links opened on it, so a channel that
//! reconnects finds its drive where it left it.

use super::drive::SimulatedDrive;
use msync_common::config::MsyncConfig;
use msync_common::consts::TICKS_PER_REVOLUTION;
use msync_common::drive::{DriveDriver, DriveError, DriveLink};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

type DriveMap = Arc<Mutex<HashMap<String, SimulatedDrive>>>;

/// Simulation driver implementing the `DriveDriver` trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Encoder resolution given to new drives
    ticks_per_revolution: u32,
    /// Addresses that refuse to open
    fail_open: HashSet<String>,
    /// Simulated drives by address
    drives: DriveMap,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            ticks_per_revolution: TICKS_PER_REVOLUTION,
            fail_open: HashSet::new(),
            drives: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Commanded speed of the drive at `address`, if it was ever opened.
    pub fn drive_rpm(&self, address: &str) -> Option<i32> {
        self.drives.lock().get(address).map(SimulatedDrive::rpm)
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &MsyncConfig) -> Result<(), DriveError> {
        if config.sync.ticks_per_revolution == 0 {
            return Err(DriveError::Config(
                "ticks_per_revolution cannot be zero".to_string(),
            ));
        }
        self.ticks_per_revolution = config.sync.ticks_per_revolution;
        self.fail_open = config.simulation.fail_open.iter().cloned().collect();
        info!(
            "Simulation driver initialized ({} ticks/rev, {} unreachable addresses)",
            self.ticks_per_revolution,
            self.fail_open.len()
        );
        Ok(())
    }

    fn open(&self, address: &str) -> Result<Box<dyn DriveLink>, DriveError> {
        if self.fail_open.contains(address) {
            return Err(DriveError::Connection {
                address: address.to_string(),
                reason: "simulated drive unreachable".to_string(),
            });
        }

        let ticks_per_revolution = self.ticks_per_revolution;
        self.drives
            .lock()
            .entry(address.to_string())
            .or_insert_with(|| {
                debug!("Creating simulated drive at {address}");
                SimulatedDrive::new(ticks_per_revolution, Instant::now())
            });

        Ok(Box::new(SimulatedLink {
            address: address.to_string(),
            drives: Arc::clone(&self.drives),
        }))
    }
}

/// Link to one simulated drive.
struct SimulatedLink {
    address: String,
    drives: DriveMap,
}

impl SimulatedLink {
    fn with_drive<T>(
        &self,
        f: impl FnOnce(&mut SimulatedDrive) -> T,
        missing: impl FnOnce(String) -> DriveError,
    ) -> Result<T, DriveError> {
        let mut drives = self.drives.lock();
        let drive = drives
            .get_mut(&self.address)
            .ok_or_else(|| missing(format!("no simulated drive at {}", self.address)))?;
        Ok(f(drive))
    }
}

impl DriveLink for SimulatedLink {
    fn set_speed(&mut self, rpm: i32) -> Result<(), DriveError> {
        self.with_drive(|d| d.set_speed(rpm, Instant::now()), DriveError::Write)
    }

    fn read_absolute_position(&mut self) -> Result<i64, DriveError> {
        self.with_drive(|d| d.position_ticks(Instant::now()), DriveError::Read)
    }
}
