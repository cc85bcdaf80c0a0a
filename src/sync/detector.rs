// src/sync/detector.rs

//! Reconciliation of observed files against recorded tracked items.

use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{CvSyncError, Result};
use crate::fs::FileSystem;
use crate::sync::fingerprint::{fingerprint_bytes, fingerprint_file};
use crate::sync::store::{ItemStore, SourceRecord, TrackedItem};
use crate::types::ItemId;

/// Case-insensitive allow-list of file extensions.
///
/// Extensions from the settings (e.g. `".pdf"`) are compiled into a
/// `GlobSet` matched against bare file names.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    set: GlobSet,
}

impl ExtensionFilter {
    pub fn from_extensions(extensions: &[String]) -> AnyResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for ext in extensions {
            let glob = GlobBuilder::new(&format!("*{ext}"))
                .case_insensitive(true)
                .build()
                .with_context(|| format!("compiling extension glob for '{ext}'"))?;
            builder.add(glob);
        }
        let set = builder.build().context("building extension glob set")?;
        Ok(Self { set })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }
}

/// Aggregate result of one reconciliation pass.
///
/// `pending_ids` lists the items that need downstream processing
/// (new and modified), in the order they were encountered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub total: usize,
    pub new: usize,
    pub modified: usize,
    pub skipped: usize,
    pub pending_ids: Vec<ItemId>,
}

/// Classifies files of a monitored source as new, modified or unchanged and
/// reconciles the classification into the item store.
///
/// A single pass performs both counting and mutation, so the returned
/// aggregates always describe exactly what this call did. Passes over the
/// same source are idempotent; callers should still serialize per-source
/// scans, since concurrent passes are not mutually exclusive.
pub struct ChangeDetector {
    fs: Arc<dyn FileSystem>,
    store: Arc<dyn ItemStore>,
    filter: ExtensionFilter,
}

impl ChangeDetector {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn ItemStore>,
        filter: ExtensionFilter,
    ) -> Self {
        Self { fs, store, filter }
    }

    /// Reconcile the current directory listing of a filesystem source.
    ///
    /// Lookup is keyed by path: a known path with a changed hash is
    /// `modified` (hash/size updated, prior error cleared), a known path
    /// with an unchanged hash is `skipped`, an unknown path is `new`.
    pub fn scan_source(&self, source: &SourceRecord) -> Result<ScanOutcome> {
        if !self.fs.is_dir(&source.path) {
            return Err(CvSyncError::SourceUnavailable(format!(
                "source directory no longer exists: {:?}",
                source.path
            )));
        }

        let entries = self.fs.read_dir(&source.path)?;

        let mut outcome = ScanOutcome::default();

        for path in entries {
            if !self.fs.is_file(&path) {
                continue;
            }
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if !self.filter.matches(&file_name) {
                continue;
            }

            let content_hash = fingerprint_file(self.fs.as_ref(), &path)?;
            let size_bytes = self.fs.file_size(&path)?;
            let key = path.to_string_lossy().to_string();

            outcome.total += 1;

            match self.store.find_item_by_path(source.id, &key)? {
                Some(existing) if existing.content_hash == content_hash => {
                    outcome.skipped += 1;
                }
                Some(existing) => {
                    self.store
                        .update_content(existing.id, &content_hash, size_bytes)?;
                    debug!(item = %existing.id, file = %file_name, "content changed; marked modified");
                    outcome.modified += 1;
                    outcome.pending_ids.push(existing.id);
                }
                None => {
                    let item =
                        TrackedItem::new(source.id, file_name, key, content_hash, size_bytes);
                    let id = item.id;
                    self.store.insert_item(item)?;
                    outcome.new += 1;
                    outcome.pending_ids.push(id);
                }
            }
        }

        self.store
            .touch_source_scanned(source.id, chrono::Utc::now())?;

        info!(
            source = %source.id,
            total = outcome.total,
            new = outcome.new,
            modified = outcome.modified,
            skipped = outcome.skipped,
            "scan complete"
        );

        Ok(outcome)
    }

    /// Reconcile an uploaded batch of `(file_name, bytes)` pairs.
    ///
    /// Uploaded files have no stable prior path, so lookup is keyed by
    /// content hash within the source: duplicate content is `skipped`,
    /// everything else is inserted as `new` under a virtual
    /// `upload://<hash>` key. Nothing is ever classified `modified` here.
    pub fn add_uploaded(
        &self,
        source: &SourceRecord,
        files: &[(String, Vec<u8>)],
    ) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();

        for (file_name, bytes) in files {
            if !self.filter.matches(file_name) {
                warn!(file = %file_name, "uploaded file has disallowed extension; ignoring");
                continue;
            }

            let content_hash = fingerprint_bytes(bytes);
            outcome.total += 1;

            match self.store.find_item_by_hash(source.id, &content_hash)? {
                Some(existing) => {
                    debug!(
                        item = %existing.id,
                        file = %file_name,
                        "duplicate upload content; skipping"
                    );
                    outcome.skipped += 1;
                }
                None => {
                    let key = format!("upload://{content_hash}");
                    let item = TrackedItem::new(
                        source.id,
                        file_name.clone(),
                        key,
                        content_hash,
                        bytes.len() as u64,
                    );
                    let id = item.id;
                    self.store.insert_item(item)?;
                    outcome.new += 1;
                    outcome.pending_ids.push(id);
                }
            }
        }

        self.store
            .touch_source_scanned(source.id, chrono::Utc::now())?;

        info!(
            source = %source.id,
            total = outcome.total,
            new = outcome.new,
            skipped = outcome.skipped,
            "upload reconciliation complete"
        );

        Ok(outcome)
    }
}
