// src/batch/throttle.rs

//! Shared pacing and retry policy for external model calls.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::batch::ProcessError;

/// Process-wide spacing between external call starts.
///
/// All workers share one throttle. Call starts are serialized to at least
/// `min_interval` apart; execution of the calls themselves still overlaps.
/// The mutex protects only the last-start bookkeeping, the wait happens
/// outside it, so slow calls never queue up behind the lock.
#[derive(Debug)]
pub struct CallThrottle {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl CallThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Wait until this caller may start the next external call.
    ///
    /// The next start slot is reserved under the lock, so concurrent callers
    /// each get their own slot and the spacing holds across workers.
    pub async fn pace(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let wait = {
            let mut last = match self.last_start.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    warn!("call throttle mutex poisoned; skipping pacing");
                    return;
                }
            };
            let now = Instant::now();
            match *last {
                Some(prev) if now < prev + self.min_interval => {
                    let slot = prev + self.min_interval;
                    *last = Some(slot);
                    slot - now
                }
                _ => {
                    *last = Some(now);
                    Duration::ZERO
                }
            }
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Retry budget and backoff schedule for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per item (first call included).
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

impl RetryPolicy {
    /// Backoff before retrying after the given zero-based attempt.
    ///
    /// Rate-limit errors back off harder but are capped at 30s; other
    /// transient errors use plain exponential backoff.
    pub fn backoff_delay(&self, attempt: u32, err: &ProcessError) -> Duration {
        let exp = 1u64 << attempt.min(16);
        match err {
            ProcessError::RateLimited(_) => Duration::from_secs((exp * 2).min(30)),
            _ => Duration::from_secs(exp),
        }
    }
}
