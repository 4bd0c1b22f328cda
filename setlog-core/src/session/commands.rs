//! Actor mailbox types
//!
//! Commands flow from the orchestrator into the execution actor over an
//! mpsc channel; outcome notifications flow back on a second channel. The
//! snapshot query rides the same mailbox with a oneshot reply so reads are
//! ordered with writes.

use super::shell::ExerciseSlot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use setlog_common::record::SetType;
use setlog_common::TemplateRef;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Values the caller may pin for a set, overriding the slot's plan
#[derive(Debug, Clone, Default)]
pub struct SetOverrides {
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f32>,
    pub set_type: Option<SetType>,
}

/// Resolved (reps, weight) for a set: explicit override wins, then the
/// slot's prescription, then the universal fallback of 10 reps at
/// bodyweight.
pub fn resolve_set_values(slot: &ExerciseSlot, overrides: &SetOverrides) -> (u32, f64) {
    let reps = overrides
        .reps
        .unwrap_or(if slot.planned_reps > 0 { slot.planned_reps } else { 10 });
    let weight_kg = overrides.weight_kg.unwrap_or(slot.planned_weight_kg);
    (reps, weight_kg)
}

/// Commands accepted by the execution actor
#[derive(Debug)]
pub enum ActorCommand {
    /// Record a completed set. With no slot given this is the cursor's
    /// current set and a rest period follows; an explicit slot backfills
    /// that slot without touching the cursor or rest state.
    CompleteSet {
        slot_index: Option<usize>,
        overrides: SetOverrides,
    },
    /// Undo a recorded set by address
    UncompleteSet { slot_index: usize, set_number: u32 },
    /// Amend a recorded set in place
    EditSet {
        slot_index: usize,
        set_number: u32,
        overrides: SetOverrides,
    },
    /// Grow the current slot's plan by one set
    AddExtraSet,
    /// Skip the rest period and move on immediately
    SkipRest,
    /// Internal: the rest timer for `generation` fired
    RestElapsed { generation: u64 },
    /// Move to the next exercise slot
    NextExercise,
    /// Move to the previous exercise slot
    PreviousExercise,
    /// Jump to an arbitrary slot
    JumpToExercise { slot_index: usize },
    /// Append a new exercise to the session
    AddExercise { slot: ExerciseSlot },
    /// Swap the exercise occupying a slot
    SubstituteExercise {
        slot_index: usize,
        replacement: ExerciseSlot,
    },
    /// Remove a slot and its recorded sets
    RemoveExercise { slot_index: usize },
    /// Reorder the exercise list
    MoveExercise { from: usize, to: usize },
    /// Metadata for an exercise arrived from the resolution broker. The
    /// actor re-locates the target slot by request id, so list edits made
    /// while resolution was in flight cannot misdirect the reply.
    ExerciseResolved {
        request_id: Uuid,
        name: Option<String>,
        rest_secs: Option<u32>,
    },
    /// Deliberate no-op, kept as an explicit command so the intent is
    /// logged (see session module docs)
    Pause,
    Resume,
    /// Finish the workout and hand the shell back. Rejected on an empty
    /// workout unless forced.
    Complete { force: bool },
    /// Abandon the workout; nothing is published
    Cancel,
    /// Ordered read of the current state
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Notifications the actor sends back to the orchestrator
#[derive(Debug)]
pub enum ActorEvent {
    /// The actor needs exercise metadata it does not have
    ResolveExercise {
        request_id: Uuid,
        exercise_ref: TemplateRef,
    },
    /// Terminal: workout finished, shell attached
    Completed { outcome: super::shell::SessionShell },
    /// Terminal: workout abandoned
    Cancelled,
    /// Terminal: the actor hit an unrecoverable fault
    Failed { message: String },
}

/// Execution sub-state as exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    PerformingSet,
    Resting,
    BetweenExercises,
}

/// Point-in-time view of the session, produced by the actor on request
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub phase: ExecutionPhase,
    pub slot_index: usize,
    pub current_set_number: u32,
    pub slots: Vec<SlotSnapshot>,
    pub total_completed_sets: usize,
    pub rest_remaining_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotSnapshot {
    pub slot_index: usize,
    pub exercise_ref: String,
    pub name: Option<String>,
    pub planned_sets: u32,
    pub completed_sets: u32,
    pub sets: Vec<SetSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetSnapshot {
    pub set_number: u32,
    pub reps: u32,
    pub weight_kg: f64,
    pub rpe: Option<f32>,
    pub set_type: SetType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlog_common::TemplateRef;

    fn slot(reps: u32, weight: f64) -> ExerciseSlot {
        ExerciseSlot {
            exercise_ref: TemplateRef::new("33401", "LOCAL", "squat"),
            name: None,
            planned_sets: 3,
            planned_reps: reps,
            planned_weight_kg: weight,
        }
    }

    #[test]
    fn test_override_beats_prescription() {
        let (reps, weight) = resolve_set_values(
            &slot(10, 60.0),
            &SetOverrides {
                reps: Some(8),
                weight_kg: Some(65.0),
                ..Default::default()
            },
        );
        assert_eq!(reps, 8);
        assert_eq!(weight, 65.0);
    }

    #[test]
    fn test_prescription_beats_fallback() {
        let (reps, weight) = resolve_set_values(&slot(5, 100.0), &SetOverrides::default());
        assert_eq!(reps, 5);
        assert_eq!(weight, 100.0);
    }

    #[test]
    fn test_fallback_when_unprescribed() {
        let (reps, weight) = resolve_set_values(&slot(0, 0.0), &SetOverrides::default());
        assert_eq!(reps, 10);
        assert_eq!(weight, 0.0);
    }
}
