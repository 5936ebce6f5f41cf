// UI event sink interface
//
// The orchestrator never talks to a window directly; it gets an explicit
// sink per request, so concurrent downloads stay independent and tests can
// observe the event stream without a live UI.

use serde::Serialize;

use crate::models::DownloadOutcome;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    Progress {
        percent: f32,
        speed: Option<String>,
        eta: Option<String>,
        message: String,
    },
    Error {
        message: String,
    },
    Info {
        message: String,
    },
    Complete {
        outcome: DownloadOutcome,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}

/// Sink that discards everything. Useful for headless callers.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DownloadEvent) {}
}

/// Sink that records every event, for tests and diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    events: std::sync::Mutex<Vec<DownloadEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DownloadEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: DownloadEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
