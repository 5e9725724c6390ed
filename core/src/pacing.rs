use std::time::{Duration, Instant};

/// Fixed delay between consecutive targets.
///
/// The first call to [`Pacer::wait`] returns immediately; every later call
/// sleeps for the configured delay. Nothing is slept after the last target.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Pacer { delay, started: false }
    }

    pub fn from_secs(secs: u64) -> Self {
        Pacer::new(Duration::from_secs(secs))
    }

    pub fn none() -> Self {
        Pacer::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Call before each target. Returns how long it actually slept.
    pub fn wait(&mut self) -> Duration {
        if !self.started {
            self.started = true;
            return Duration::ZERO;
        }
        if self.delay.is_zero() {
            return Duration::ZERO;
        }
        tracing::debug!(delay_ms = self.delay.as_millis() as u64, "pausing before next target");
        let t = Instant::now();
        std::thread::sleep(self.delay);
        t.elapsed()
    }
}
