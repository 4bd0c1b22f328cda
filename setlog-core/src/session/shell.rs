//! Session shell
//!
//! The aggregate record of a workout in progress: ordered exercise slots,
//! completed sets, the modification audit log, and per-slot counters. Owned
//! exclusively by the execution actor until completion, then moved by value
//! to the orchestrator.
//!
//! Slots are positional. Completed sets reference their slot by index, so
//! every structural edit (remove, reorder) must remap set indices in the
//! same operation - an orphaned or stale index is a defect.

use chrono::{DateTime, Utc};
use setlog_common::record::SetType;
use setlog_common::TemplateRef;
use std::collections::HashMap;
use uuid::Uuid;

/// One positional entry in the session's exercise list
#[derive(Debug, Clone)]
pub struct ExerciseSlot {
    /// Reference to the exercise definition (may repeat across slots)
    pub exercise_ref: TemplateRef,
    /// Human-readable name; None until metadata resolution fills it in
    pub name: Option<String>,
    pub planned_sets: u32,
    pub planned_reps: u32,
    /// Planned weight in kilograms; 0.0 means bodyweight
    pub planned_weight_kg: f64,
}

/// One performed set
#[derive(Debug, Clone)]
pub struct CompletedSet {
    /// Index of the owning slot at the time of recording (remapped on
    /// structural edits)
    pub slot_index: usize,
    /// Per-slot ordinal, 1-based, unique within the slot
    pub set_number: u32,
    pub reps: u32,
    pub weight_kg: f64,
    /// Perceived-effort score (RPE), if reported
    pub rpe: Option<f32>,
    pub set_type: SetType,
    pub completed_at: DateTime<Utc>,
}

/// Audit entry for an in-session exercise-list edit. Append-only.
#[derive(Debug, Clone)]
pub struct ModificationRecord {
    pub change: SlotChange,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum SlotChange {
    Added {
        slot_index: usize,
        exercise_ref: TemplateRef,
    },
    Removed {
        slot_index: usize,
        exercise_ref: TemplateRef,
    },
    Substituted {
        slot_index: usize,
        old_ref: TemplateRef,
        new_ref: TemplateRef,
    },
    Reordered {
        from: usize,
        to: usize,
    },
}

/// The workout-in-progress aggregate
#[derive(Debug, Clone)]
pub struct SessionShell {
    pub id: Uuid,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub slots: Vec<ExerciseSlot>,
    pub completed_sets: Vec<CompletedSet>,
    pub modifications: Vec<ModificationRecord>,
    /// Extra sets requested per slot index (keyed by index, not exercise
    /// reference, so duplicated exercises stay distinguishable)
    pub extra_sets: HashMap<usize, u32>,
    /// Pause accounting. Defined but not driven: pause is currently a
    /// deliberate no-op pending product confirmation.
    pub paused_at: Option<DateTime<Utc>>,
    pub total_pause_secs: i64,
}

impl SessionShell {
    /// Create an empty shell for a new session
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            started_at: Utc::now(),
            ended_at: None,
            slots: Vec::new(),
            completed_sets: Vec::new(),
            modifications: Vec::new(),
            extra_sets: HashMap::new(),
            paused_at: None,
            total_pause_secs: 0,
        }
    }

    /// Number of completed sets recorded against a slot
    pub fn completed_in_slot(&self, slot_index: usize) -> u32 {
        self.completed_sets
            .iter()
            .filter(|s| s.slot_index == slot_index)
            .count() as u32
    }

    /// Next per-slot ordinal: one past the highest ordinal present.
    ///
    /// Derived from recorded sets rather than a separately stored counter,
    /// so it stays monotonic even after out-of-order or removed sets.
    pub fn next_ordinal(&self, slot_index: usize) -> u32 {
        self.completed_sets
            .iter()
            .filter(|s| s.slot_index == slot_index)
            .map(|s| s.set_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Planned sets for a slot including explicitly requested extras
    pub fn effective_planned_sets(&self, slot_index: usize) -> u32 {
        let planned = self
            .slots
            .get(slot_index)
            .map(|s| s.planned_sets)
            .unwrap_or(0);
        planned + self.extra_sets.get(&slot_index).copied().unwrap_or(0)
    }

    /// Record a completed set. If a set with the same (slot, ordinal)
    /// address already exists it is replaced in place.
    pub fn record_set(&mut self, set: CompletedSet) {
        if let Some(existing) = self
            .completed_sets
            .iter_mut()
            .find(|s| s.slot_index == set.slot_index && s.set_number == set.set_number)
        {
            *existing = set;
        } else {
            self.completed_sets.push(set);
        }
    }

    /// Remove the set addressed by (slot, ordinal). Returns true if found.
    pub fn remove_set(&mut self, slot_index: usize, set_number: u32) -> bool {
        let before = self.completed_sets.len();
        self.completed_sets
            .retain(|s| !(s.slot_index == slot_index && s.set_number == set_number));
        self.completed_sets.len() != before
    }

    /// Find a recorded set by address
    pub fn find_set_mut(&mut self, slot_index: usize, set_number: u32) -> Option<&mut CompletedSet> {
        self.completed_sets
            .iter_mut()
            .find(|s| s.slot_index == slot_index && s.set_number == set_number)
    }

    /// Increment the extra-sets counter for a slot
    pub fn add_extra_set(&mut self, slot_index: usize) {
        *self.extra_sets.entry(slot_index).or_insert(0) += 1;
    }

    /// Append a slot at the end of the list, logging the modification
    pub fn add_slot(&mut self, slot: ExerciseSlot) -> usize {
        let slot_index = self.slots.len();
        self.modifications.push(ModificationRecord {
            change: SlotChange::Added {
                slot_index,
                exercise_ref: slot.exercise_ref.clone(),
            },
            at: Utc::now(),
        });
        self.slots.push(slot);
        slot_index
    }

    /// Replace the exercise occupying a slot. Completed sets stay attached
    /// to the slot index. Returns false if the index is out of range.
    pub fn substitute_slot(&mut self, slot_index: usize, replacement: ExerciseSlot) -> bool {
        let Some(existing) = self.slots.get_mut(slot_index) else {
            return false;
        };
        let old_ref = existing.exercise_ref.clone();
        let new_ref = replacement.exercise_ref.clone();
        *existing = replacement;
        self.modifications.push(ModificationRecord {
            change: SlotChange::Substituted {
                slot_index,
                old_ref,
                new_ref,
            },
            at: Utc::now(),
        });
        true
    }

    /// Remove a slot: purges every completed set recorded against it and
    /// shifts higher indices down so no set is left referencing a stale
    /// position. Returns false if the index is out of range.
    pub fn remove_slot(&mut self, slot_index: usize) -> bool {
        if slot_index >= self.slots.len() {
            return false;
        }
        let removed = self.slots.remove(slot_index);

        self.completed_sets.retain(|s| s.slot_index != slot_index);
        for set in &mut self.completed_sets {
            if set.slot_index > slot_index {
                set.slot_index -= 1;
            }
        }

        self.extra_sets = self
            .extra_sets
            .drain()
            .filter(|(idx, _)| *idx != slot_index)
            .map(|(idx, n)| if idx > slot_index { (idx - 1, n) } else { (idx, n) })
            .collect();

        self.modifications.push(ModificationRecord {
            change: SlotChange::Removed {
                slot_index,
                exercise_ref: removed.exercise_ref,
            },
            at: Utc::now(),
        });
        true
    }

    /// Move a slot from one position to another, remapping every completed
    /// set and extra-set counter to the new permutation. Lossless: total
    /// set count and per-slot associations are preserved.
    pub fn move_slot(&mut self, from: usize, to: usize) -> bool {
        if from >= self.slots.len() || to >= self.slots.len() {
            return false;
        }
        if from == to {
            return true;
        }

        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);

        let remap = |idx: usize| -> usize {
            if idx == from {
                to
            } else if from < to && idx > from && idx <= to {
                idx - 1
            } else if to < from && idx >= to && idx < from {
                idx + 1
            } else {
                idx
            }
        };

        for set in &mut self.completed_sets {
            set.slot_index = remap(set.slot_index);
        }
        self.extra_sets = self
            .extra_sets
            .drain()
            .map(|(idx, n)| (remap(idx), n))
            .collect();

        self.modifications.push(ModificationRecord {
            change: SlotChange::Reordered { from, to },
            at: Utc::now(),
        });
        true
    }

    /// Total completed sets in the session
    pub fn total_sets(&self) -> usize {
        self.completed_sets.len()
    }
}
