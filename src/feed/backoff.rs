use std::time::Duration;

pub const BASE_DELAY: Duration = Duration::from_millis(2_000);
pub const MAX_DELAY: Duration = Duration::from_millis(10_000);
pub const FACTOR: f64 = 1.5;

/// Capped multiplicative reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    factor: f64,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BASE_DELAY, MAX_DELAY, FACTOR)
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, factor: f64) -> Self {
        Self {
            base,
            max,
            factor,
            current: base,
        }
    }

    /// Returns the delay to wait now and grows the next one, never past the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.factor).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }

    pub fn base(&self) -> Duration {
        self.base
    }
}
