use rand::Rng;
use std::thread;
use std::time::Duration;

/// Every delay in the automation thread goes through a `Sleeper`.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);

    fn sleep_ms(&self, ms: u64) {
        self.sleep(Duration::from_millis(ms));
    }
}

/// Real thread sleep with optional +/- `jitter` fraction of randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper {
    jitter: f64,
}

impl ThreadSleeper {
    pub fn new(jitter: f64) -> Self {
        Self { jitter: jitter.clamp(0.0, 0.9) }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        let secs = duration.as_secs_f64();
        if self.jitter <= 0.0 || secs <= 0.0 {
            thread::sleep(duration);
            return;
        }
        let spread = secs * self.jitter;
        let actual = secs + rand::thread_rng().gen_range(-spread..spread);
        thread::sleep(Duration::from_secs_f64(actual.max(0.01)));
    }
}
