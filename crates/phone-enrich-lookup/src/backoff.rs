//! Retry policy and the sleeping seam.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::LookupError;

/// Something that can block the current thread. Tests substitute a recorder.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Records requested sleeps without blocking. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    log: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        match self.log.lock() {
            Ok(mut log) => log.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}

/// Exponential backoff with a fixed attempt ceiling.
///
/// The delay after failed attempt `n` (1-based) is `base * 2^(n-1)`, raised to
/// any server `Retry-After`, and capped at `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(2),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// `Some(delay)` if another attempt should follow failed attempt `attempt`.
    pub fn next_delay(&self, attempt: u32, error: &LookupError) -> Option<Duration> {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return None;
        }
        Some(self.delay_for(attempt, error.retry_after()))
    }

    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let exponential = self.base.saturating_mul(1u32 << exponent);
        exponential
            .max(retry_after.unwrap_or_default())
            .min(self.max)
    }
}
