use std::sync::Mutex;

use tracing::debug;

use cvsync::watch::{EventPublisher, WatchEvent};

/// Publisher that records every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<WatchEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WatchEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &WatchEvent) {
        debug!(channel = %event.channel(), "recording published event");
        self.events.lock().unwrap().push(event.clone());
    }
}
