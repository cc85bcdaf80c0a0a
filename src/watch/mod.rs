// src/watch/mod.rs

//! Filesystem watch bridge.
//!
//! Observes create/modify/delete notifications for monitored sources and
//! publishes lightweight events to an external channel. It deliberately does
//! not invoke the change detector or the scheduler itself; consuming the
//! events is the embedding application's job.

pub mod bridge;

pub use bridge::{EventPublisher, NoopPublisher, WatchEvent, WatchEventKind, WatchRegistry};
