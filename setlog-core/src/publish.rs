//! Record construction
//!
//! Turns a finished session shell into the append-only workout record.
//! Sets are emitted in (slot, ordinal) order so the record reads in the
//! order the workout was structured, regardless of when sets were
//! recorded or edited.

use crate::session::shell::SessionShell;
use setlog_common::record::{set_tag, template_tag, WorkoutRecord};
use setlog_common::TemplateRef;

/// Build the publishable record for a completed workout
pub fn build_record(shell: &SessionShell, template_ref: &TemplateRef) -> WorkoutRecord {
    let mut sets: Vec<_> = shell.completed_sets.iter().collect();
    sets.sort_by_key(|s| (s.slot_index, s.set_number));

    let mut tags = Vec::with_capacity(sets.len() + 1);
    tags.push(template_tag(template_ref));
    for set in sets {
        // The slot's CURRENT exercise reference; substitutions apply to
        // already-recorded sets by design of the shell
        let exercise_ref = shell
            .slots
            .get(set.slot_index)
            .map(|slot| slot.exercise_ref.to_string())
            .unwrap_or_default();
        tags.push(set_tag(
            &exercise_ref,
            set.set_number,
            set.weight_kg,
            set.reps,
            set.rpe,
            set.set_type,
        ));
    }

    let created_at = shell
        .ended_at
        .unwrap_or(shell.started_at)
        .timestamp();

    WorkoutRecord::new(created_at, tags, shell.title.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::shell::{CompletedSet, ExerciseSlot};
    use chrono::Utc;
    use setlog_common::record::{SetType, WORKOUT_RECORD_KIND};

    fn shell_with_sets() -> (SessionShell, TemplateRef) {
        let template_ref = TemplateRef::new("33402", "npub-author", "push-day");
        let mut shell = SessionShell::new("Push Day".to_string());
        for disc in ["bench", "dips"] {
            shell.slots.push(ExerciseSlot {
                exercise_ref: TemplateRef::new("33401", "npub-author", disc),
                name: Some(disc.to_string()),
                planned_sets: 2,
                planned_reps: 10,
                planned_weight_kg: 0.0,
            });
        }
        // Recorded out of structural order on purpose
        for (slot_index, set_number, weight) in [(1, 1, 0.0), (0, 2, 80.0), (0, 1, 80.0)] {
            shell.record_set(CompletedSet {
                slot_index,
                set_number,
                reps: 10,
                weight_kg: weight,
                rpe: None,
                set_type: SetType::Normal,
                completed_at: Utc::now(),
            });
        }
        shell.ended_at = Some(Utc::now());
        (shell, template_ref)
    }

    #[test]
    fn test_record_orders_sets_by_slot_then_ordinal() {
        let (shell, template_ref) = shell_with_sets();
        let record = build_record(&shell, &template_ref);

        let set_tags: Vec<_> = record.tags_named("set").collect();
        assert_eq!(set_tags.len(), 3);
        assert!(set_tags[0][1].ends_with(":bench"));
        assert_eq!(set_tags[0][2], "1");
        assert_eq!(set_tags[1][2], "2");
        assert!(set_tags[2][1].ends_with(":dips"));
    }

    #[test]
    fn test_record_carries_template_back_reference() {
        let (shell, template_ref) = shell_with_sets();
        let record = build_record(&shell, &template_ref);

        let template_tags: Vec<_> = record.tags_named("template").collect();
        assert_eq!(template_tags.len(), 1);
        assert_eq!(template_tags[0][1], "33402:npub-author:push-day");
        assert_eq!(record.kind, WORKOUT_RECORD_KIND);
        assert_eq!(record.content, "Push Day");
    }

    #[test]
    fn test_identical_content_distinguished_by_ordinal() {
        // Two sets with identical values differ only in the ordinal field,
        // which is what keeps content addressing from collapsing them
        let template_ref = TemplateRef::new("33402", "npub-author", "legs");
        let mut shell = SessionShell::new("Legs".to_string());
        shell.slots.push(ExerciseSlot {
            exercise_ref: TemplateRef::new("33401", "npub-author", "squat"),
            name: None,
            planned_sets: 2,
            planned_reps: 5,
            planned_weight_kg: 100.0,
        });
        for set_number in [1, 2] {
            shell.record_set(CompletedSet {
                slot_index: 0,
                set_number,
                reps: 5,
                weight_kg: 100.0,
                rpe: None,
                set_type: SetType::Normal,
                completed_at: Utc::now(),
            });
        }
        let record = build_record(&shell, &template_ref);
        let set_tags: Vec<_> = record.tags_named("set").collect();
        assert_ne!(set_tags[0], set_tags[1]);
    }
}
