// src/watch/bridge.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::sync::detector::ExtensionFilter;
use crate::types::SourceId;

/// What happened to a file in a watched source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchEventKind {
    Created,
    Modified,
    Deleted,
}

/// Lightweight event published for a watched source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub kind: WatchEventKind,
    pub path: PathBuf,
    pub source_id: SourceId,
}

impl WatchEvent {
    /// Channel name this event is published on.
    pub fn channel(&self) -> String {
        format!("source:{}:events", self.source_id)
    }

    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(err) => {
                warn!(source = %self.source_id, error = %err, "failed to serialize watch event");
                String::new()
            }
        }
    }
}

/// Fire-and-forget sink for watch events (e.g. a pub/sub client).
///
/// Implementations must tolerate being called from a background task and
/// must not block for long. Publishing failures are the implementation's
/// problem to log; the bridge never retries.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &WatchEvent);
}

/// Used when no event channel is configured; events are logged and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, event: &WatchEvent) {
        debug!(
            channel = %event.channel(),
            payload = %event.to_json(),
            "no event publisher configured; dropping watch event"
        );
    }
}

/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle
/// stops file watching for that source.
struct WatchHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish()
    }
}

/// One active filesystem subscription per source id.
///
/// `start_watch` on an already-watched source and `stop_watch` on an
/// unwatched source are no-ops that report "state unchanged" (false) rather
/// than erroring.
pub struct WatchRegistry {
    filter: ExtensionFilter,
    publisher: Arc<dyn EventPublisher>,
    watchers: Mutex<HashMap<SourceId, WatchHandle>>,
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl WatchRegistry {
    pub fn new(filter: ExtensionFilter, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            filter,
            publisher,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Start watching a source directory (non-recursive).
    ///
    /// Returns true if a subscription was started, false if the source was
    /// already being watched. Must be called from within a Tokio runtime.
    ///
    /// Watcher setup performs blocking syscalls, so the handle is built
    /// before the registry lock is taken; the lock covers only the map
    /// insert.
    pub fn start_watch(&self, source_id: SourceId, path: &Path) -> Result<bool> {
        if self.is_watching(source_id) {
            info!(source = %source_id, "already watching");
            return Ok(false);
        }

        let handle = spawn_source_watcher(
            source_id,
            path,
            self.filter.clone(),
            Arc::clone(&self.publisher),
        )?;

        let mut watchers = self
            .watchers
            .lock()
            .map_err(|_| anyhow::anyhow!("watch registry mutex poisoned"))?;
        if watchers.contains_key(&source_id) {
            // A racing caller got there first; dropping our handle stops
            // the extra watcher.
            info!(source = %source_id, "already watching");
            return Ok(false);
        }
        watchers.insert(source_id, handle);
        info!(source = %source_id, ?path, "started watching");
        Ok(true)
    }

    /// Stop watching a source.
    ///
    /// Returns true if a subscription was removed, false if the source was
    /// not being watched.
    pub fn stop_watch(&self, source_id: SourceId) -> bool {
        let mut watchers = match self.watchers.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(source = %source_id, "watch registry mutex poisoned");
                return false;
            }
        };
        match watchers.remove(&source_id) {
            Some(_handle) => {
                info!(source = %source_id, "stopped watching");
                true
            }
            None => {
                info!(source = %source_id, "not watching");
                false
            }
        }
    }

    pub fn is_watching(&self, source_id: SourceId) -> bool {
        self.watchers
            .lock()
            .map(|w| w.contains_key(&source_id))
            .unwrap_or(false)
    }

    /// Drop all subscriptions (shutdown path).
    pub fn stop_all(&self) {
        if let Ok(mut watchers) = self.watchers.lock() {
            let count = watchers.len();
            watchers.clear();
            if count > 0 {
                info!(count, "stopped all watch subscriptions");
            }
        }
    }
}

/// Wire up a notify watcher for one source directory and spawn the async
/// task that filters its events and publishes them.
fn spawn_source_watcher(
    source_id: SourceId,
    path: &Path,
    filter: ExtensionFilter,
    publisher: Arc<dyn EventPublisher>,
) -> Result<WatchHandle> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // We can't log via tracing here easily, so fallback to stderr.
                        eprintln!("cvsync: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("cvsync: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )
    .context("creating filesystem watcher")?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching directory {:?}", path))?;

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(source = %source_id, ?event, "received notify event");

            let kind = match event.kind {
                EventKind::Create(_) => WatchEventKind::Created,
                EventKind::Modify(_) => WatchEventKind::Modified,
                EventKind::Remove(_) => WatchEventKind::Deleted,
                _ => continue,
            };

            for path in event.paths {
                let file_name = match path.file_name().and_then(|n| n.to_str()) {
                    Some(name) => name.to_string(),
                    None => continue,
                };
                // Directories never match the extension allow-list.
                if !filter.matches(&file_name) {
                    continue;
                }

                let watch_event = WatchEvent {
                    kind,
                    path: path.clone(),
                    source_id,
                };
                info!(
                    source = %source_id,
                    ?kind,
                    file = %file_name,
                    "watch event"
                );
                publisher.publish(&watch_event);
            }
        }
        debug!(source = %source_id, "watch event loop finished");
    });

    Ok(WatchHandle { _inner: watcher })
}
