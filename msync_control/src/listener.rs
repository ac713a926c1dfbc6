//! Command listener: bus subscription → command router.
//!
//! Waits out the start-up delay, subscribes to `motion/#` and hands every
//! message to [`handle_message`](crate::command::handle_message). A lost
//! subscription is logged and retried after the resubscribe delay; it is
//! never fatal. The loop returns only once the run flag is cleared.

use crate::command::handle_message;
use crate::state::ControlState;
use msync_common::bus::{BusError, MessageBus, Subscription};
use msync_common::config::SyncConfig;
use msync_common::consts::TOPIC_MOTION_FILTER;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Longest uninterrupted wait on the subscription or a delay, so the run
/// flag is observed promptly.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Bus-driven command intake.
pub struct CommandListener {
    state: Arc<ControlState>,
    bus: Arc<dyn MessageBus>,
    start_delay: Duration,
    resubscribe_delay: Duration,
    messages: u64,
}

impl CommandListener {
    /// Create a listener.
    pub fn new(
        state: Arc<ControlState>,
        bus: Arc<dyn MessageBus>,
        start_delay: Duration,
        resubscribe_delay: Duration,
    ) -> Self {
        Self {
            state,
            bus,
            start_delay,
            resubscribe_delay,
            messages: 0,
        }
    }

    /// Create a listener with the delays of the `[sync]` table.
    pub fn from_config(config: &SyncConfig, state: Arc<ControlState>, bus: Arc<dyn MessageBus>) -> Self {
        Self::new(
            state,
            bus,
            config.listener_start_delay(),
            config.resubscribe_delay(),
        )
    }

    /// Messages received so far.
    pub fn messages_handled(&self) -> u64 {
        self.messages
    }

    /// Run until the shared run flag is cleared.
    pub fn run(&mut self) {
        if !self.pause(self.start_delay) {
            return;
        }

        while self.state.is_running() {
            let lost = match self.bus.subscribe(TOPIC_MOTION_FILTER) {
                Ok(subscription) => {
                    info!("Listening for commands on {TOPIC_MOTION_FILTER}");
                    match self.drain(subscription) {
                        Ok(()) => break,
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            warn!(
                "Bus connection lost ({lost}), resubscribing in {} s",
                self.resubscribe_delay.as_secs_f64()
            );
            if !self.pause(self.resubscribe_delay) {
                break;
            }
        }

        info!("Command listener stopped after {} messages", self.messages);
    }

    /// Feed messages to the router until the bus fails or the run ends.
    fn drain(&mut self, mut subscription: Box<dyn Subscription>) -> Result<(), BusError> {
        while self.state.is_running() {
            if let Some(message) = subscription.next_message(POLL_SLICE)? {
                self.messages += 1;
                handle_message(&self.state, &message);
            }
        }
        Ok(())
    }

    /// Sleep for `delay` in slices; returns `false` if the run ended meanwhile.
    fn pause(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        while self.state.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(POLL_SLICE));
        }
        false
    }
}
