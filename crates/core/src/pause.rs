//! Cooperative pause shared between the automation thread and the hotkey observer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::info;

use crate::sleep::Sleeper;

/// Process-wide suspend flag. Toggled by the hotkey thread, honored by every
/// blocking step of the automation thread.
pub struct PauseController {
    paused: Mutex<bool>,
    sleeper: Arc<dyn Sleeper>,
    poll_interval: Duration,
    heartbeat_every: u32,
}

impl PauseController {
    pub fn new(sleeper: Arc<dyn Sleeper>, poll_interval: Duration, heartbeat_every: u32) -> Self {
        Self {
            paused: Mutex::new(false),
            sleeper,
            poll_interval,
            heartbeat_every: heartbeat_every.max(1),
        }
    }

    /// Flip the flag and return the new state.
    pub fn toggle(&self) -> bool {
        let mut paused = self.paused.lock().unwrap_or_else(|e| e.into_inner());
        *paused = !*paused;
        info!(target: "pause", "{}", if *paused { "paused" } else { "resumed" });
        *paused
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until the flag reads `false`, logging a heartbeat while idle.
    pub fn wait_until_resumed(&self) {
        let mut polls: u32 = 0;
        while self.is_paused() {
            if polls % self.heartbeat_every == 0 {
                info!(target: "pause", "paused, press F11 to resume");
            }
            self.sleeper.sleep(self.poll_interval);
            polls = polls.wrapping_add(1);
        }
    }
}
