// src/lib.rs

//! Batch task orchestration and folder synchronization for a résumé
//! tracking system.
//!
//! The crate is the in-process core an HTTP layer embeds:
//!
//! - [`sync`] detects which files of a monitored source are new or changed
//!   using content hashing and reconciles them into the item store.
//! - [`batch`] fans independent per-item operations (parse, match) out over
//!   a bounded worker pool and tracks pollable progress per batch.
//! - [`watch`] bridges filesystem notifications to an external event
//!   channel.
//!
//! [`CvSync`] wires these together behind the operations an embedding layer
//! needs. It is a best-effort, single-process orchestrator: task state is
//! not durable and there is no cross-process coordination.

pub mod batch;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod sync;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::batch::{BatchScheduler, ItemProcessor, ProgressSnapshot, ProgressStore};
use crate::config::Settings;
use crate::errors::{CvSyncError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::sync::detector::{ChangeDetector, ExtensionFilter, ScanOutcome};
use crate::sync::store::{ItemStore, SourceRecord};
use crate::types::{BatchId, BatchKind, ItemId, SourceId};
use crate::watch::{EventPublisher, NoopPublisher, WatchRegistry};

/// High-level entry point tying together change detection, batch
/// orchestration and the watch bridge.
///
/// Construct one per process and share it; all state behind it is
/// internally synchronized. Callers should serialize scans of the same
/// source (concurrent passes are idempotent but not mutually exclusive).
pub struct CvSync {
    fs: Arc<dyn FileSystem>,
    store: Arc<dyn ItemStore>,
    detector: ChangeDetector,
    scheduler: BatchScheduler,
    watches: WatchRegistry,
}

impl CvSync {
    /// Wire up the core against a persistence implementation, using the real
    /// filesystem and dropping watch events (no publisher).
    pub fn new(settings: Settings, store: Arc<dyn ItemStore>) -> Result<Self> {
        Self::with_parts(
            settings,
            Arc::new(RealFileSystem),
            store,
            Arc::new(NoopPublisher),
        )
    }

    /// Fully injected constructor for tests and embedders that bring their
    /// own filesystem or event channel.
    pub fn with_parts(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn ItemStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        config::validate::validate_settings(&settings)?;

        let filter = ExtensionFilter::from_extensions(&settings.allowed_extensions)?;
        let detector = ChangeDetector::new(Arc::clone(&fs), Arc::clone(&store), filter.clone());
        let progress = ProgressStore::new();
        let scheduler = BatchScheduler::new(progress, Arc::clone(&store), &settings);
        let watches = WatchRegistry::new(filter, publisher);

        Ok(Self {
            fs,
            store,
            detector,
            scheduler,
            watches,
        })
    }

    /// Register a directory as a monitored source.
    ///
    /// The path is canonicalized and must exist; registering the same path
    /// twice is rejected.
    pub fn register_source(&self, path: &Path, label: Option<String>) -> Result<SourceRecord> {
        let path = self.fs.canonicalize(path)?;
        if !self.fs.is_dir(&path) {
            return Err(CvSyncError::SourceUnavailable(format!(
                "not a directory: {:?}",
                path
            )));
        }
        if self.store.find_source_by_path(&path)?.is_some() {
            return Err(CvSyncError::ConfigError(format!(
                "source already registered: {:?}",
                path
            )));
        }

        let label = label.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string())
        });
        let source = SourceRecord::new(path, label);
        let record = source.clone();
        self.store.insert_source(source)?;
        info!(source = %record.id, path = ?record.path, "source registered");
        Ok(record)
    }

    /// Remove a source, its items and any active watch subscription.
    pub fn remove_source(&self, source_id: SourceId) -> Result<bool> {
        self.watches.stop_watch(source_id);
        self.store.remove_source(source_id).map_err(Into::into)
    }

    /// Reconcile the source directory against its recorded items.
    ///
    /// Blocking and synchronous, bounded by directory size.
    pub fn scan_source(&self, source_id: SourceId) -> Result<ScanOutcome> {
        let source = self.lookup_source(source_id)?;
        self.detector.scan_source(&source)
    }

    /// Reconcile uploaded `(file_name, bytes)` payloads into a source.
    pub fn add_uploaded(
        &self,
        source_id: SourceId,
        files: &[(String, Vec<u8>)],
    ) -> Result<ScanOutcome> {
        let source = self.lookup_source(source_id)?;
        self.detector.add_uploaded(&source, files)
    }

    /// Submit a batch of item operations; returns the batch id immediately.
    pub fn submit_batch(
        &self,
        kind: BatchKind,
        item_ids: Vec<ItemId>,
        processor: Arc<dyn ItemProcessor>,
    ) -> Result<BatchId> {
        self.scheduler.submit(kind, item_ids, processor)
    }

    /// Poll a batch's progress; unknown ids yield the `unknown` sentinel.
    pub fn get_progress(&self, batch_id: BatchId) -> ProgressSnapshot {
        self.scheduler.progress(batch_id)
    }

    /// Start publishing filesystem events for a source.
    ///
    /// Returns true if the watch state changed (false: already watching).
    pub fn start_watch(&self, source_id: SourceId) -> Result<bool> {
        let source = self.lookup_source(source_id)?;
        self.watches.start_watch(source_id, &source.path)
    }

    /// Stop publishing filesystem events for a source.
    ///
    /// Returns true if the watch state changed (false: was not watching).
    pub fn stop_watch(&self, source_id: SourceId) -> bool {
        self.watches.stop_watch(source_id)
    }

    pub fn is_watching(&self, source_id: SourceId) -> bool {
        self.watches.is_watching(source_id)
    }

    /// Stop all watch subscriptions. Call on shutdown; in-flight batches
    /// keep running until their items finish.
    pub fn shutdown(&self) {
        self.watches.stop_all();
    }

    /// Access the underlying item store (per-item results live here, not in
    /// the progress snapshots).
    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    fn lookup_source(&self, source_id: SourceId) -> Result<SourceRecord> {
        self.store
            .get_source(source_id)?
            .ok_or(CvSyncError::SourceNotFound(source_id))
    }
}
