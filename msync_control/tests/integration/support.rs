//! Scripted drive rig and bus helpers shared by the integration tests.

use msync_bus::{BusNotifier, LocalBus};
use msync_common::prelude::{
    ChannelConfig, DriveDriver, DriveError, DriveLink, MessageBus, Subscription, SyncConfig,
};
use msync_control::cycle::PollCycle;
use msync_control::state::ControlState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

pub const MOTOR1: &str = "/dev/motor1";
pub const MOTOR2: &str = "/dev/motor2";

/// Behaviour and history of one scripted drive.
#[derive(Debug, Clone)]
pub struct DriveScript {
    pub online: bool,
    pub read_fails: bool,
    pub write_fails: bool,
    pub position: i64,
    pub speeds: Vec<i32>,
    pub opens: usize,
}

impl Default for DriveScript {
    fn default() -> Self {
        Self {
            online: true,
            read_fails: false,
            write_fails: false,
            position: 0,
            speeds: Vec::new(),
            opens: 0,
        }
    }
}

/// Drives keyed by address, shared between the test and the driver.
#[derive(Clone, Default)]
pub struct Rig(Arc<Mutex<HashMap<String, DriveScript>>>);

impl Rig {
    pub fn new() -> Self {
        let rig = Self::default();
        rig.edit(MOTOR1, |_| {});
        rig.edit(MOTOR2, |_| {});
        rig
    }

    pub fn edit(&self, address: &str, f: impl FnOnce(&mut DriveScript)) {
        f(self.0.lock().entry(address.to_string()).or_default());
    }

    pub fn drive(&self, address: &str) -> DriveScript {
        self.0.lock().get(address).cloned().unwrap_or_default()
    }

    pub fn driver(&self) -> Arc<dyn DriveDriver> {
        Arc::new(RigDriver(self.clone()))
    }
}

struct RigDriver(Rig);

impl DriveDriver for RigDriver {
    fn name(&self) -> &'static str {
        "rig"
    }

    fn version(&self) -> &'static str {
        "0.0.0"
    }

    fn open(&self, address: &str) -> Result<Box<dyn DriveLink>, DriveError> {
        let mut drives = (self.0).0.lock();
        let drive = drives.entry(address.to_string()).or_default();
        drive.opens += 1;
        if !drive.online {
            return Err(DriveError::Connection {
                address: address.to_string(),
                reason: "no such device".to_string(),
            });
        }
        Ok(Box::new(RigLink {
            rig: self.0.clone(),
            address: address.to_string(),
        }))
    }
}

struct RigLink {
    rig: Rig,
    address: String,
}

impl DriveLink for RigLink {
    fn set_speed(&mut self, rpm: i32) -> Result<(), DriveError> {
        let mut drives = self.rig.0.lock();
        let drive = drives.entry(self.address.clone()).or_default();
        if drive.write_fails {
            return Err(DriveError::Write("no ack".to_string()));
        }
        drive.speeds.push(rpm);
        Ok(())
    }

    fn read_absolute_position(&mut self) -> Result<i64, DriveError> {
        let drives = self.rig.0.lock();
        match drives.get(&self.address) {
            Some(drive) if !drive.read_fails => Ok(drive.position),
            _ => Err(DriveError::Read("timeout".to_string())),
        }
    }
}

pub fn sync_config(single: bool) -> SyncConfig {
    SyncConfig {
        single_motor: single,
        channels: vec![
            ChannelConfig::new("Motor1", MOTOR1),
            ChannelConfig::new("Motor2", MOTOR2),
        ],
        poll_interval_ms: 10,
        listener_start_delay_ms: 0,
        resubscribe_delay_ms: 20,
        ..SyncConfig::default()
    }
}

/// Everything a scenario needs, with a subscription on `server/#`.
pub struct Harness {
    pub rig: Rig,
    pub bus: Arc<LocalBus>,
    pub state: Arc<ControlState>,
    pub cycle: PollCycle,
    pub outbound: Box<dyn Subscription>,
}

impl Harness {
    pub fn new(single: bool) -> Self {
        let rig = Rig::new();
        let config = sync_config(single);
        let bus = Arc::new(LocalBus::new());
        let outbound = bus.subscribe("server/#").unwrap();
        let state = Arc::new(
            ControlState::from_config(&config, rig.driver(), Arc::new(AtomicBool::new(true)))
                .unwrap(),
        );
        let notifier = BusNotifier::new(bus.clone());
        let cycle = PollCycle::from_config(&config, Arc::clone(&state), notifier);
        Self {
            rig,
            bus,
            state,
            cycle,
            outbound,
        }
    }

    /// Every outbound message published so far, as `(topic, text)`.
    pub fn published(&mut self) -> Vec<(String, String)> {
        drain(self.outbound.as_mut())
    }

    /// Outbound texts on one topic.
    pub fn published_on(&mut self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, text)| text)
            .collect()
    }
}

pub fn drain(subscription: &mut dyn Subscription) -> Vec<(String, String)> {
    let mut out = Vec::new();
    while let Some(message) = subscription.next_message(Duration::from_millis(1)).unwrap() {
        let text = message.payload_str().unwrap_or_default().to_string();
        out.push((message.topic, text));
    }
    out
}

pub fn revolutions(rev: f64) -> i64 {
    (rev * 65_536.0).round() as i64
}
