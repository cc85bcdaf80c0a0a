// src/sync/mod.rs

//! Folder synchronization: content fingerprinting and change detection.
//!
//! The flow is:
//! 1. enumerate candidate files (or uploaded byte batches),
//! 2. fingerprint their content ([`fingerprint`]),
//! 3. reconcile against the recorded items ([`store`]) to classify each
//!    file as new / modified / skipped ([`detector`]).
//!
//! Reconciliation is idempotent: rescanning an unchanged source classifies
//! everything as skipped and mutates nothing.

pub mod detector;
pub mod fingerprint;
pub mod store;

pub use detector::{ChangeDetector, ExtensionFilter, ScanOutcome};
pub use fingerprint::{fingerprint_bytes, fingerprint_file};
pub use store::{ItemStore, MemoryItemStore, SourceRecord, TrackedItem};
