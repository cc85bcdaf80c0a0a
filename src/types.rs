// src/types.rs

//! Core identifier and status types shared across the crate.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a monitored source (a folder or an upload bucket).
pub type SourceId = Uuid;
/// Identifier of a tracked item (one résumé file).
pub type ItemId = Uuid;
/// Identifier of a submitted batch.
pub type BatchId = Uuid;

/// Lifecycle status of a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    New,
    Modified,
    Processing,
    Processed,
    Error,
}

/// Status of a batch as seen by pollers.
///
/// There is deliberately no `failed` variant: per-item failures are recorded
/// on the items themselves and a batch always runs to `Completed`.
/// `Unknown` is the sentinel returned for identifiers the progress registry
/// has never seen; it is terminal from a poller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Matching,
    Completed,
    Unknown,
}

impl BatchStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Unknown)
    }
}

/// What kind of work the items of a batch perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    /// Extract structured data from one résumé.
    Parse,
    /// Score one résumé against a job posting.
    Match,
}

impl BatchKind {
    /// The in-flight status shown while a batch of this kind runs.
    pub fn running_status(self) -> BatchStatus {
        match self {
            BatchKind::Parse => BatchStatus::Processing,
            BatchKind::Match => BatchStatus::Matching,
        }
    }

    pub fn start_message(self, total: usize) -> String {
        match self {
            BatchKind::Parse => format!("Processing {total} CVs"),
            BatchKind::Match => format!("Matching {total} CVs"),
        }
    }

    pub fn step_message(self, done: usize, total: usize) -> String {
        match self {
            BatchKind::Parse => format!("Processed {done}/{total}"),
            BatchKind::Match => format!("Matched {done}/{total}"),
        }
    }

    pub fn done_message(self) -> String {
        match self {
            BatchKind::Parse => "All CVs processed".to_string(),
            BatchKind::Match => "All CVs matched".to_string(),
        }
    }
}

impl FromStr for BatchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parse" => Ok(BatchKind::Parse),
            "match" => Ok(BatchKind::Match),
            other => Err(format!(
                "invalid batch kind: {other} (expected \"parse\" or \"match\")"
            )),
        }
    }
}
