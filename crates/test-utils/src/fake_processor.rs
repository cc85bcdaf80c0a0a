use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

use cvsync::batch::{ItemOutcome, ItemProcessor, ProcessError};
use cvsync::types::ItemId;

/// A fake item processor that:
/// - records every call and the peak number of concurrent calls
/// - optionally sleeps to keep items in flight
/// - fails permanently for a configured set of items.
#[derive(Debug, Default)]
pub struct FakeProcessor {
    delay: Duration,
    failing: HashSet<ItemId>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make `process` fail permanently for these items.
    pub fn failing_items(mut self, items: impl IntoIterator<Item = ItemId>) -> Self {
        self.failing = items.into_iter().collect();
        self
    }

    /// Total number of `process` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl ItemProcessor for FakeProcessor {
    fn process(
        &self,
        item: ItemId,
    ) -> Pin<Box<dyn Future<Output = Result<ItemOutcome, ProcessError>> + Send + '_>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            debug!(item = %item, "fake processor handled item");

            if self.failing.contains(&item) {
                Err(ProcessError::Permanent(format!(
                    "simulated provider rejection for {item}"
                )))
            } else {
                Ok(ItemOutcome {
                    candidate_name: Some(format!("Candidate {item}")),
                    ..ItemOutcome::default()
                })
            }
        })
    }
}

/// A processor that fails transiently a fixed number of times per item
/// before succeeding, for exercising the retry path.
#[derive(Debug)]
pub struct FlakyProcessor {
    failures_before_success: u32,
    attempts: Mutex<HashMap<ItemId, u32>>,
}

impl FlakyProcessor {
    pub fn new(failures_before_success: u32) -> Self {
        Self {
            failures_before_success,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn attempts_for(&self, item: ItemId) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(&item)
            .copied()
            .unwrap_or(0)
    }
}

impl ItemProcessor for FlakyProcessor {
    fn process(
        &self,
        item: ItemId,
    ) -> Pin<Box<dyn Future<Output = Result<ItemOutcome, ProcessError>> + Send + '_>> {
        Box::pin(async move {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let counter = attempts.entry(item).or_insert(0);
                *counter += 1;
                *counter
            };

            if attempt <= self.failures_before_success {
                Err(ProcessError::Transient(format!(
                    "simulated timeout on attempt {attempt}"
                )))
            } else {
                Ok(ItemOutcome::default())
            }
        })
    }
}
