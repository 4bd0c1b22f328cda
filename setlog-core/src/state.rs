//! Shared service state
//!
//! Thread-safe state shared between the HTTP layer and the orchestrator.
//! Event fan-out uses a broadcast channel so any number of SSE listeners
//! can subscribe without coordinating with the writers.

use setlog_common::events::SessionEvent;
use tokio::sync::broadcast;

/// State accessible by all components
pub struct SharedState {
    /// Event broadcaster for SSE listeners
    pub event_tx: broadcast::Sender<SessionEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self { event_tx }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: SessionEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
