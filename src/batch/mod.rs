// src/batch/mod.rs

//! Batch orchestration: bounded concurrent fan-out of per-item operations
//! with live, pollable progress.
//!
//! This module ties together:
//! - the [`ItemProcessor`] seam (the external model call, one item at a time)
//! - the shared call throttle and retry policy ([`throttle`])
//! - the progress registry pollers read ([`progress`])
//! - the scheduler that fans a batch out over a bounded worker pool
//!   ([`scheduler`])

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::types::ItemId;

pub mod progress;
pub mod scheduler;
pub mod throttle;

pub use progress::{ProgressSnapshot, ProgressStore};
pub use scheduler::BatchScheduler;
pub use throttle::{CallThrottle, RetryPolicy};

/// Typed outcome of one external-model call.
///
/// The provider returns a loosely-shaped payload; implementations of
/// [`ItemProcessor`] convert it to this struct at the boundary so the rest
/// of the core operates on named, optional fields.
#[derive(Debug, Clone, Default)]
pub struct ItemOutcome {
    /// Candidate name extracted by a parse operation.
    pub candidate_name: Option<String>,
    /// Overall score produced by a match operation.
    pub score: Option<f32>,
    /// Fit classification produced by a match operation.
    pub fit_status: Option<String>,
}

/// Failure of one external-model call.
///
/// The variant decides retry behaviour: `RateLimited` and `Transient`
/// failures are retried with backoff, `Permanent` failures are not.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl ProcessError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, ProcessError::Permanent(_))
    }
}

/// Trait abstracting the per-item unit of work (the external model call).
///
/// Implementations must be safe to call concurrently from multiple workers
/// with different item ids. A failing call returns an error; it must never
/// panic, and a failure never affects sibling items.
pub trait ItemProcessor: Send + Sync {
    fn process(
        &self,
        item: ItemId,
    ) -> Pin<Box<dyn Future<Output = Result<ItemOutcome, ProcessError>> + Send + '_>>;
}
