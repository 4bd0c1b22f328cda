//! Event types for the setlog event system
//!
//! Broadcast to SSE listeners on every externally-visible state change.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Setlog event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Top-level lifecycle state changed
    LifecycleStateChanged {
        state: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A session seed was confirmed and the execution actor spawned
    SessionStarted {
        session_id: Uuid,
        template_ref: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A set was recorded
    SetCompleted {
        session_id: Uuid,
        slot_index: usize,
        set_number: u32,
        reps: u32,
        weight_kg: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A previously recorded set was removed
    SetUncompleted {
        session_id: Uuid,
        slot_index: usize,
        set_number: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The exercise slot list changed (add/remove/substitute/reorder)
    SlotListChanged {
        session_id: Uuid,
        slots: Vec<SlotInfo>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progression cursor moved to a new slot/set
    CursorMoved {
        session_id: Uuid,
        slot_index: usize,
        set_number: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Rest period started after a completed set
    RestStarted {
        session_id: Uuid,
        slot_index: usize,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Rest period ended (elapsed or skipped)
    RestEnded {
        session_id: Uuid,
        skipped: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Workout completed; final shell handed to the orchestrator
    WorkoutCompleted {
        session_id: Uuid,
        set_count: usize,
        duration_secs: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Workout cancelled; nothing will be published
    WorkoutCancelled {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Final record accepted by the publisher (or queued, which counts)
    RecordPublished {
        session_id: Uuid,
        record_id: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Publication failed; the workout itself is preserved
    PublishFailed {
        session_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Slot information for SSE events and snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotInfo {
    pub slot_index: usize,
    pub exercise_ref: String,
    pub name: Option<String>,
    pub planned_sets: u32,
    pub completed_sets: u32,
}

impl SessionEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SessionEvent::LifecycleStateChanged { .. } => "LifecycleStateChanged",
            SessionEvent::SessionStarted { .. } => "SessionStarted",
            SessionEvent::SetCompleted { .. } => "SetCompleted",
            SessionEvent::SetUncompleted { .. } => "SetUncompleted",
            SessionEvent::SlotListChanged { .. } => "SlotListChanged",
            SessionEvent::CursorMoved { .. } => "CursorMoved",
            SessionEvent::RestStarted { .. } => "RestStarted",
            SessionEvent::RestEnded { .. } => "RestEnded",
            SessionEvent::WorkoutCompleted { .. } => "WorkoutCompleted",
            SessionEvent::WorkoutCancelled { .. } => "WorkoutCancelled",
            SessionEvent::RecordPublished { .. } => "RecordPublished",
            SessionEvent::PublishFailed { .. } => "PublishFailed",
        }
    }
}
