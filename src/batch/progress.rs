// src/batch/progress.rs

//! Process-wide registry of live batch progress.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{BatchId, BatchStatus};

#[derive(Debug, Clone)]
struct BatchProgress {
    current: usize,
    total: usize,
    status: BatchStatus,
    message: String,
    created_at: DateTime<Utc>,
}

/// What a poller sees for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub current: usize,
    pub total: usize,
    pub status: BatchStatus,
    pub message: String,
}

impl ProgressSnapshot {
    /// Sentinel returned for identifiers the registry has never seen.
    /// Pollers treat it as terminal, distinct from `completed`.
    pub fn unknown() -> Self {
        Self {
            current: 0,
            total: 0,
            status: BatchStatus::Unknown,
            message: String::new(),
        }
    }
}

/// Thread-safe map from batch id to its live progress.
///
/// Cloning the store clones a handle to the same underlying map; construct
/// one per process (or per test) and inject it, rather than reaching for a
/// global. The mutex is held only for the read-modify-write, never across
/// any I/O.
///
/// Entries are never evicted here; completed batches stay readable for the
/// process lifetime. Embedding layers that care can call [`remove`].
///
/// [`remove`]: ProgressStore::remove
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    inner: Arc<Mutex<HashMap<BatchId, BatchProgress>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted batch as `pending` with zero progress.
    pub fn create(&self, id: BatchId, total: usize) {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(batch = %id, "progress store mutex poisoned; dropping create");
                return;
            }
        };
        map.insert(
            id,
            BatchProgress {
                current: 0,
                total,
                status: BatchStatus::Pending,
                message: String::new(),
                created_at: Utc::now(),
            },
        );
        debug!(batch = %id, total, "created progress entry");
    }

    /// Apply one progress update.
    ///
    /// The scheduler is the single writer per batch and issues updates in
    /// order; repeating an identical update is harmless. An update for an
    /// unknown id (re-)creates the entry rather than failing.
    pub fn update(
        &self,
        id: BatchId,
        current: usize,
        total: usize,
        status: BatchStatus,
        message: impl Into<String>,
    ) {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(batch = %id, "progress store mutex poisoned; dropping update");
                return;
            }
        };
        let entry = map.entry(id).or_insert_with(|| BatchProgress {
            current: 0,
            total,
            status: BatchStatus::Pending,
            message: String::new(),
            created_at: Utc::now(),
        });
        entry.current = current;
        entry.total = total;
        entry.status = status;
        entry.message = message.into();
    }

    /// Snapshot the progress of a batch.
    ///
    /// Never blocks for long and never mutates; unknown ids yield the
    /// `unknown` sentinel rather than an error.
    pub fn get(&self, id: BatchId) -> ProgressSnapshot {
        let map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(batch = %id, "progress store mutex poisoned; reporting unknown");
                return ProgressSnapshot::unknown();
            }
        };
        match map.get(&id) {
            Some(p) => ProgressSnapshot {
                current: p.current,
                total: p.total,
                status: p.status,
                message: p.message.clone(),
            },
            None => ProgressSnapshot::unknown(),
        }
    }

    /// When a batch was created, if the registry knows it.
    pub fn created_at(&self, id: BatchId) -> Option<DateTime<Utc>> {
        let map = self.inner.lock().ok()?;
        map.get(&id).map(|p| p.created_at)
    }

    /// Drop a progress entry. Returns false if the id was unknown.
    ///
    /// The core never calls this; it exists so an embedding layer can apply
    /// its own eviction policy.
    pub fn remove(&self, id: BatchId) -> bool {
        match self.inner.lock() {
            Ok(mut map) => map.remove(&id).is_some(),
            Err(_) => false,
        }
    }
}
