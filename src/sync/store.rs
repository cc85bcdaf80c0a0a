// src/sync/store.rs

//! Persisted records for monitored sources and their tracked items.
//!
//! The core only needs create / update / lookup-by-id / lookup-by-unique-key
//! operations, expressed by the [`ItemStore`] trait. Production deployments
//! implement it on top of their database; [`MemoryItemStore`] ships for
//! tests and single-process setups.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::types::{ItemId, ItemStatus, SourceId};

/// A monitored source: a folder on disk, or a virtual bucket for uploads.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub id: SourceId,
    pub path: PathBuf,
    pub label: String,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn new(path: PathBuf, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            label: label.into(),
            last_scanned_at: None,
            created_at: Utc::now(),
        }
    }
}

/// One tracked file (or uploaded payload) belonging to a source.
///
/// `(source_id, path_or_key)` is unique within a store. For filesystem
/// sources `path_or_key` is the absolute path; for uploads it is a virtual
/// `upload://<hash>` key, since uploaded files have no stable prior path.
#[derive(Debug, Clone)]
pub struct TrackedItem {
    pub id: ItemId,
    pub source_id: SourceId,
    pub file_name: String,
    pub path_or_key: String,
    pub content_hash: String,
    pub size_bytes: u64,
    pub status: ItemStatus,
    pub error_message: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TrackedItem {
    pub fn new(
        source_id: SourceId,
        file_name: impl Into<String>,
        path_or_key: impl Into<String>,
        content_hash: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            file_name: file_name.into(),
            path_or_key: path_or_key.into(),
            content_hash: content_hash.into(),
            size_bytes,
            status: ItemStatus::New,
            error_message: None,
            detected_at: Utc::now(),
            processed_at: None,
        }
    }
}

/// Abstract persistence for sources and tracked items.
///
/// Implementations must be safe to call concurrently from multiple workers;
/// the orchestration core never coordinates transactions across calls.
pub trait ItemStore: Send + Sync {
    fn insert_source(&self, source: SourceRecord) -> Result<()>;
    fn get_source(&self, id: SourceId) -> Result<Option<SourceRecord>>;
    fn find_source_by_path(&self, path: &Path) -> Result<Option<SourceRecord>>;
    /// Remove a source and all of its items. Returns false if the source was
    /// unknown.
    fn remove_source(&self, id: SourceId) -> Result<bool>;
    fn touch_source_scanned(&self, id: SourceId, at: DateTime<Utc>) -> Result<()>;

    fn insert_item(&self, item: TrackedItem) -> Result<()>;
    fn get_item(&self, id: ItemId) -> Result<Option<TrackedItem>>;
    fn find_item_by_path(&self, source: SourceId, path_or_key: &str)
        -> Result<Option<TrackedItem>>;
    fn find_item_by_hash(&self, source: SourceId, content_hash: &str)
        -> Result<Option<TrackedItem>>;
    fn items_for_source(&self, source: SourceId) -> Result<Vec<TrackedItem>>;

    /// Record changed content: update hash and size, reset status to
    /// `modified`, clear any prior error.
    fn update_content(&self, id: ItemId, content_hash: &str, size_bytes: u64) -> Result<()>;
    fn set_status(&self, id: ItemId, status: ItemStatus) -> Result<()>;
    /// Mark an item failed with a (pre-truncated) message.
    fn record_error(&self, id: ItemId, message: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    sources: HashMap<SourceId, SourceRecord>,
    items: HashMap<ItemId, TrackedItem>,
}

/// Stores records in memory only.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("item store mutex poisoned"))
    }
}

impl ItemStore for MemoryItemStore {
    fn insert_source(&self, source: SourceRecord) -> Result<()> {
        let mut inner = self.lock()?;
        debug!(source = %source.id, path = ?source.path, "registered source (memory)");
        inner.sources.insert(source.id, source);
        Ok(())
    }

    fn get_source(&self, id: SourceId) -> Result<Option<SourceRecord>> {
        let inner = self.lock()?;
        Ok(inner.sources.get(&id).cloned())
    }

    fn find_source_by_path(&self, path: &Path) -> Result<Option<SourceRecord>> {
        let inner = self.lock()?;
        Ok(inner.sources.values().find(|s| s.path == path).cloned())
    }

    fn remove_source(&self, id: SourceId) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner.sources.remove(&id).is_none() {
            return Ok(false);
        }
        // Source deletion cascades to its items.
        let before = inner.items.len();
        inner.items.retain(|_, item| item.source_id != id);
        debug!(
            source = %id,
            removed_items = before - inner.items.len(),
            "removed source and its items (memory)"
        );
        Ok(true)
    }

    fn touch_source_scanned(&self, id: SourceId, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock()?;
        let source = inner
            .sources
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown source: {id}"))?;
        source.last_scanned_at = Some(at);
        Ok(())
    }

    fn insert_item(&self, item: TrackedItem) -> Result<()> {
        let mut inner = self.lock()?;
        let duplicate = inner
            .items
            .values()
            .any(|i| i.source_id == item.source_id && i.path_or_key == item.path_or_key);
        if duplicate {
            return Err(anyhow!(
                "item already tracked for source {}: {}",
                item.source_id,
                item.path_or_key
            ));
        }
        inner.items.insert(item.id, item);
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> Result<Option<TrackedItem>> {
        let inner = self.lock()?;
        Ok(inner.items.get(&id).cloned())
    }

    fn find_item_by_path(
        &self,
        source: SourceId,
        path_or_key: &str,
    ) -> Result<Option<TrackedItem>> {
        let inner = self.lock()?;
        Ok(inner
            .items
            .values()
            .find(|i| i.source_id == source && i.path_or_key == path_or_key)
            .cloned())
    }

    fn find_item_by_hash(
        &self,
        source: SourceId,
        content_hash: &str,
    ) -> Result<Option<TrackedItem>> {
        let inner = self.lock()?;
        Ok(inner
            .items
            .values()
            .find(|i| i.source_id == source && i.content_hash == content_hash)
            .cloned())
    }

    fn items_for_source(&self, source: SourceId) -> Result<Vec<TrackedItem>> {
        let inner = self.lock()?;
        Ok(inner
            .items
            .values()
            .filter(|i| i.source_id == source)
            .cloned()
            .collect())
    }

    fn update_content(&self, id: ItemId, content_hash: &str, size_bytes: u64) -> Result<()> {
        let mut inner = self.lock()?;
        let item = inner
            .items
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown item: {id}"))?;
        item.content_hash = content_hash.to_string();
        item.size_bytes = size_bytes;
        item.status = ItemStatus::Modified;
        item.error_message = None;
        item.detected_at = Utc::now();
        Ok(())
    }

    fn set_status(&self, id: ItemId, status: ItemStatus) -> Result<()> {
        let mut inner = self.lock()?;
        let item = inner
            .items
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown item: {id}"))?;
        item.status = status;
        if status == ItemStatus::Processed {
            item.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn record_error(&self, id: ItemId, message: &str) -> Result<()> {
        let mut inner = self.lock()?;
        let item = inner
            .items
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown item: {id}"))?;
        item.status = ItemStatus::Error;
        item.error_message = Some(message.to_string());
        item.processed_at = Some(Utc::now());
        Ok(())
    }
}
