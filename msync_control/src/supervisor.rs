//! Activity supervision and the fatal-exit policy.
//!
//! Each activity runs on its own named thread with panics caught. The first
//! activity to end decides the outcome: if the run flag was already cleared
//! (Ctrl-C) it is a clean shutdown; anything else is fatal.

use crate::error::ControlError;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

struct ExitReport {
    activity: &'static str,
    result: Result<(), ControlError>,
}

/// Runs the long-lived activities and reports how the first one ended.
pub struct Supervisor {
    running: Arc<AtomicBool>,
    tx: Sender<ExitReport>,
    rx: Receiver<ExitReport>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Supervisor {
    /// Create a supervisor sharing the process run flag.
    pub fn new(running: Arc<AtomicBool>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            running,
            tx,
            rx,
            handles: Vec::new(),
        }
    }

    /// Start `body` on a thread named `activity`.
    ///
    /// # Errors
    /// `ControlError::Spawn` if the OS refuses the thread.
    pub fn spawn<F>(&mut self, activity: &'static str, body: F) -> Result<(), ControlError>
    where
        F: FnOnce() -> Result<(), ControlError> + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = thread::Builder::new()
            .name(activity.to_string())
            .spawn(move || {
                let result = match catch_unwind(AssertUnwindSafe(body)) {
                    Ok(result) => result,
                    Err(payload) => Err(ControlError::ActivityPanicked {
                        activity,
                        message: panic_message(payload.as_ref()),
                    }),
                };
                // Receiver gone means the process is already exiting.
                let _ = tx.send(ExitReport { activity, result });
            })
            .map_err(|source| ControlError::Spawn { activity, source })?;

        debug!("Spawned {activity}");
        self.handles.push((activity, handle));
        Ok(())
    }

    /// Block until the first activity ends.
    ///
    /// On a clean shutdown the remaining activities are joined.
    ///
    /// # Errors
    /// The failure of an activity that ended while the run flag was still
    /// set. The run flag is cleared before returning so the others wind
    /// down, but they are not joined.
    pub fn wait(self) -> Result<(), ControlError> {
        let Self {
            running,
            tx,
            rx,
            handles,
        } = self;
        drop(tx);

        let Ok(first) = rx.recv() else {
            // No activity was ever spawned.
            return Ok(());
        };

        if running.swap(false, Ordering::SeqCst) {
            let err = match first.result {
                Err(e) => e,
                Ok(()) => ControlError::ActivityStopped(first.activity),
            };
            error!("{} terminated: {err}", first.activity);
            return Err(err);
        }

        if let Err(e) = &first.result {
            error!("{} failed during shutdown: {e}", first.activity);
        }
        for (activity, handle) in handles {
            if handle.join().is_err() {
                error!("{activity} thread could not be joined");
            }
        }
        info!("All activities stopped");
        Ok(())
    }
}

/// Wait imposed before exiting after a fatal error.
///
/// Zero when attached to an interactive shell, so a developer sees the
/// failure immediately; `cooldown` otherwise, so a service manager does not
/// restart the process in a tight loop.
pub fn fatal_cooldown(interactive: bool, cooldown: Duration) -> Duration {
    if interactive { Duration::ZERO } else { cooldown }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
