//! Politeness delay before live fetches.

use std::time::Duration;

use rand::Rng;

use crate::backoff::Sleeper;

/// Fixed delay plus optional uniform jitter, applied before each live fetch.
/// Cache hits never reach the pacer.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacer {
    delay: Duration,
    jitter: Duration,
}

impl Pacer {
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }

    /// From seconds; negative or non-finite values count as zero.
    pub fn from_secs_f64(delay_sec: f64, jitter_sec: f64) -> Self {
        let secs = |v: f64| {
            if v.is_finite() && v > 0.0 {
                Duration::from_secs_f64(v)
            } else {
                Duration::ZERO
            }
        };
        Self::new(secs(delay_sec), secs(jitter_sec))
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter.as_secs_f64());
        self.delay + Duration::from_secs_f64(extra)
    }

    /// Sleep before a fetch; returns the time slept.
    pub fn pause(&self, sleeper: &mut dyn Sleeper) -> Duration {
        let delay = self.next_delay();
        if !delay.is_zero() {
            sleeper.sleep(delay);
        }
        delay
    }
}
