// src/batch/scheduler.rs

//! Fire-and-forget batch submission over a bounded worker pool.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::batch::progress::{ProgressSnapshot, ProgressStore};
use crate::batch::throttle::{CallThrottle, RetryPolicy};
use crate::batch::{ItemOutcome, ItemProcessor, ProcessError};
use crate::config::Settings;
use crate::errors::{CvSyncError, Result};
use crate::sync::store::ItemStore;
use crate::types::{BatchId, BatchKind, BatchStatus, ItemId, ItemStatus};

/// Orchestrates batches of independent item operations.
///
/// `submit` registers a progress entry and returns a batch id immediately;
/// a supervisor task fans the items out over at most `max_parallel`
/// concurrent workers and is the single writer of that batch's progress.
/// There is no batch-level failure and no cancellation: every submitted
/// batch runs to `completed`, with per-item errors recorded on the items.
pub struct BatchScheduler {
    progress: ProgressStore,
    store: Arc<dyn ItemStore>,
    throttle: Arc<CallThrottle>,
    retry: RetryPolicy,
    max_parallel: usize,
    error_message_limit: usize,
}

impl BatchScheduler {
    pub fn new(progress: ProgressStore, store: Arc<dyn ItemStore>, settings: &Settings) -> Self {
        Self {
            progress,
            store,
            throttle: Arc::new(CallThrottle::new(settings.min_call_interval())),
            retry: RetryPolicy {
                max_attempts: settings.max_retries,
            },
            max_parallel: settings.max_parallel,
            error_message_limit: settings.error_message_limit,
        }
    }

    /// Submit a batch for processing.
    ///
    /// Returns the new batch id without waiting for any item to finish.
    /// The only synchronous failure is an empty item list; everything after
    /// submission is reported through the progress registry and the item
    /// store. Must be called from within a Tokio runtime.
    pub fn submit(
        &self,
        kind: BatchKind,
        item_ids: Vec<ItemId>,
        processor: Arc<dyn ItemProcessor>,
    ) -> Result<BatchId> {
        if item_ids.is_empty() {
            return Err(CvSyncError::EmptyBatch);
        }

        let batch_id = Uuid::new_v4();
        let total = item_ids.len();
        self.progress.create(batch_id, total);

        let ctx = RunContext {
            batch_id,
            kind,
            progress: self.progress.clone(),
            store: Arc::clone(&self.store),
            throttle: Arc::clone(&self.throttle),
            retry: self.retry,
            max_parallel: self.max_parallel,
            error_message_limit: self.error_message_limit,
        };

        tokio::spawn(run_batch(ctx, item_ids, processor));

        info!(batch = %batch_id, ?kind, total, "batch submitted");
        Ok(batch_id)
    }

    /// Snapshot a batch's progress (the `unknown` sentinel for unknown ids).
    pub fn progress(&self, id: BatchId) -> ProgressSnapshot {
        self.progress.get(id)
    }
}

/// Everything a batch run needs, cloned out of the scheduler at submission.
#[derive(Clone)]
struct RunContext {
    batch_id: BatchId,
    kind: BatchKind,
    progress: ProgressStore,
    store: Arc<dyn ItemStore>,
    throttle: Arc<CallThrottle>,
    retry: RetryPolicy,
    max_parallel: usize,
    error_message_limit: usize,
}

struct ItemResult {
    item: ItemId,
    ok: bool,
}

/// Supervisor for one batch.
///
/// Spawns one worker per item under a shared semaphore and drains their
/// completion reports serially, so progress writes for this batch are
/// totally ordered and `current` increments exactly once per item.
async fn run_batch(ctx: RunContext, item_ids: Vec<ItemId>, processor: Arc<dyn ItemProcessor>) {
    let total = item_ids.len();
    let running = ctx.kind.running_status();

    ctx.progress.update(
        ctx.batch_id,
        0,
        total,
        running,
        ctx.kind.start_message(total),
    );

    let semaphore = Arc::new(Semaphore::new(ctx.max_parallel));
    let (done_tx, mut done_rx) = mpsc::channel::<ItemResult>(total);

    for item in item_ids {
        let ctx = ctx.clone();
        let semaphore = Arc::clone(&semaphore);
        let processor = Arc::clone(&processor);
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed while workers run.
                Err(_) => return,
            };

            let ok = run_item(&ctx, item, processor.as_ref()).await;

            if done_tx.send(ItemResult { item, ok }).await.is_err() {
                debug!(batch = %ctx.batch_id, item = %item, "batch supervisor gone; dropping result");
            }
        });
    }
    drop(done_tx);

    let mut done = 0usize;
    while let Some(result) = done_rx.recv().await {
        done += 1;
        if !result.ok {
            debug!(batch = %ctx.batch_id, item = %result.item, "item completed with failure");
        }
        ctx.progress.update(
            ctx.batch_id,
            done,
            total,
            running,
            ctx.kind.step_message(done, total),
        );
    }

    ctx.progress.update(
        ctx.batch_id,
        total,
        total,
        BatchStatus::Completed,
        ctx.kind.done_message(),
    );
    info!(batch = %ctx.batch_id, total, "batch completed");
}

/// Process one item end to end: mark it processing, run the external call
/// with pacing and retries, record the outcome on the item record.
///
/// Returns whether the item succeeded. Never panics; any failure is folded
/// into the item's error record so siblings are unaffected.
async fn run_item(ctx: &RunContext, item: ItemId, processor: &dyn ItemProcessor) -> bool {
    if let Err(err) = ctx.store.set_status(item, ItemStatus::Processing) {
        warn!(batch = %ctx.batch_id, item = %item, error = %err, "failed to mark item processing");
    }

    match process_with_retry(processor, &ctx.throttle, ctx.retry, item).await {
        Ok(outcome) => {
            log_outcome(ctx, item, &outcome);
            if let Err(err) = ctx.store.set_status(item, ItemStatus::Processed) {
                warn!(batch = %ctx.batch_id, item = %item, error = %err, "failed to mark item processed");
            }
            true
        }
        Err(err) => {
            let message = truncate_chars(&err.to_string(), ctx.error_message_limit);
            warn!(batch = %ctx.batch_id, item = %item, error = %err, "item failed permanently");
            if let Err(err) = ctx.store.record_error(item, &message) {
                warn!(batch = %ctx.batch_id, item = %item, error = %err, "failed to record item error");
            }
            false
        }
    }
}

/// Run the external call, pacing every start through the shared throttle and
/// retrying transient failures with backoff until the attempt budget runs
/// out. Exhausted retries surface as a permanent error.
async fn process_with_retry(
    processor: &dyn ItemProcessor,
    throttle: &CallThrottle,
    retry: RetryPolicy,
    item: ItemId,
) -> std::result::Result<ItemOutcome, ProcessError> {
    let mut attempt = 0u32;
    loop {
        throttle.pace().await;
        match processor.process(item).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) if err.is_transient() && attempt + 1 < retry.max_attempts => {
                let delay = retry.backoff_delay(attempt, &err);
                warn!(
                    item = %item,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "external call failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_transient() => {
                return Err(ProcessError::Permanent(format!(
                    "retries exhausted after {} attempts: {err}",
                    retry.max_attempts
                )));
            }
            Err(err) => return Err(err),
        }
    }
}

fn log_outcome(ctx: &RunContext, item: ItemId, outcome: &ItemOutcome) {
    match ctx.kind {
        BatchKind::Parse => {
            debug!(
                batch = %ctx.batch_id,
                item = %item,
                candidate = outcome.candidate_name.as_deref().unwrap_or("?"),
                "item parsed"
            );
        }
        BatchKind::Match => {
            debug!(
                batch = %ctx.batch_id,
                item = %item,
                score = outcome.score.unwrap_or(0.0),
                fit = outcome.fit_status.as_deref().unwrap_or("?"),
                "item matched"
            );
        }
    }
}

/// Truncate on a character boundary.
fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
