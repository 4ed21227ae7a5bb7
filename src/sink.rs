//! Transport-agnostic event emission boundary.

use std::sync::Mutex;

use crate::engine::events::RunEvent;

/// The abstract event emitter a run writes to.
///
/// The engine makes no assumption about delivery transport; any
/// implementation providing ordered, at-least-once-within-process delivery
/// is acceptable.
pub trait Sink: Send + Sync {
    /// Deliver one event.
    fn send(&self, event: RunEvent);

    /// Optional: the transport is going away.
    fn disconnect(&self) {}
}

/// A sink that drops everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn send(&self, _event: RunEvent) {}
}

/// An in-process sink that collects events in order.
///
/// Useful for tests and for embedders that consume a run's events after the
/// fact rather than streaming them.
#[derive(Debug, Default)]
pub struct BufferSink {
    events: Mutex<Vec<RunEvent>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far, in delivery order.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Terminal events received (there should be at most one per run).
    pub fn terminal_events(&self) -> Vec<RunEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.is_terminal())
            .collect()
    }
}

impl Sink for BufferSink {
    fn send(&self, event: RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
