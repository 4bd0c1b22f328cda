//! Active execution actor
//!
//! Owns the session shell for the duration of the workout. All mutation
//! flows through the command mailbox, so the shell needs no locking and
//! reads (snapshots) are ordered with writes.
//!
//! Invalid commands for the current phase are logged and dropped, never
//! fatal: a stray button press must not kill a workout.

use super::commands::{
    resolve_set_values, ActorCommand, ActorEvent, ExecutionPhase, SessionSnapshot, SetOverrides,
    SetSnapshot, SlotSnapshot,
};
use super::cursor::ProgressionCursor;
use super::rest::rest_duration_secs;
use super::shell::{CompletedSet, ExerciseSlot, SessionShell};
use crate::error::ValidationFault;
use crate::state::SharedState;
use chrono::Utc;
use setlog_common::events::{SessionEvent, SlotInfo};
use setlog_common::record::SetType;
use setlog_common::TemplateRef;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-exercise metadata the actor needs at run time
#[derive(Debug, Clone)]
pub struct ExerciseMeta {
    pub name: String,
    pub rest_secs: u32,
}

/// Partially assembled session inputs, produced by the setup coordinator.
/// Every field is optional until `validate` proves otherwise.
#[derive(Debug, Default)]
pub struct SeedDraft {
    pub user_identity: Option<String>,
    pub shell_title: Option<String>,
    pub template_ref: Option<TemplateRef>,
    pub slots: Option<Vec<ExerciseSlot>>,
    pub exercise_meta: Option<HashMap<String, ExerciseMeta>>,
}

/// Fully validated inputs for spawning an execution actor
#[derive(Debug)]
pub struct SessionSeed {
    pub user_identity: String,
    pub shell_title: String,
    pub template_ref: TemplateRef,
    pub slots: Vec<ExerciseSlot>,
    pub exercise_meta: HashMap<String, ExerciseMeta>,
}

impl SeedDraft {
    /// Check every required input is present. Reports ALL missing pieces
    /// at once rather than failing on the first, so the caller can fix
    /// the setup in one pass.
    pub fn validate(self) -> Result<SessionSeed, Vec<ValidationFault>> {
        let mut faults = Vec::new();
        if self.user_identity.is_none() {
            faults.push(ValidationFault::MissingUserIdentity);
        }
        if self.shell_title.is_none() {
            faults.push(ValidationFault::MissingSessionShell);
        }
        if self.template_ref.is_none() {
            faults.push(ValidationFault::MissingTemplateSelection);
        }
        match &self.slots {
            None => faults.push(ValidationFault::MissingResolvedTemplate),
            Some(slots) if slots.is_empty() => {
                faults.push(ValidationFault::MissingResolvedTemplate)
            }
            _ => {}
        }
        if self.exercise_meta.is_none() {
            faults.push(ValidationFault::MissingExerciseDefs);
        }
        if !faults.is_empty() {
            return Err(faults);
        }
        // Unwraps are proven present by the fault checks above
        Ok(SessionSeed {
            user_identity: self.user_identity.unwrap(),
            shell_title: self.shell_title.unwrap(),
            template_ref: self.template_ref.unwrap(),
            slots: self.slots.unwrap(),
            exercise_meta: self.exercise_meta.unwrap(),
        })
    }
}

/// Handle to a running execution actor
pub struct ActorHandle {
    pub session_id: Uuid,
    pub cmd_tx: mpsc::Sender<ActorCommand>,
}

/// Spawn the execution actor for a validated seed. Returns immediately;
/// the actor runs until a terminal command arrives or the command channel
/// closes.
pub fn spawn(
    seed: SessionSeed,
    state: Arc<SharedState>,
    event_tx: mpsc::Sender<ActorEvent>,
) -> ActorHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);

    let mut shell = SessionShell::new(seed.shell_title);
    shell.slots = seed.slots;
    // Backfill names the setup phase could not resolve
    for slot in &mut shell.slots {
        if slot.name.is_none() {
            slot.name = seed
                .exercise_meta
                .get(&slot.exercise_ref.to_string())
                .map(|m| m.name.clone());
        }
    }
    let session_id = shell.id;

    let actor = ExecutionActor {
        shell,
        cursor: ProgressionCursor::default(),
        phase: ExecutionPhase::PerformingSet,
        exercise_meta: seed.exercise_meta,
        state,
        event_tx,
        self_tx: cmd_tx.downgrade(),
        rest_generation: 0,
        rest_deadline: None,
        pending_resolutions: HashMap::new(),
    };

    info!(
        session_id = %session_id,
        template = %seed.template_ref,
        slots = actor.shell.slots.len(),
        "execution actor starting"
    );
    actor.state.broadcast_event(SessionEvent::SessionStarted {
        session_id,
        template_ref: seed.template_ref.to_string(),
        timestamp: Utc::now(),
    });

    tokio::spawn(actor.run(cmd_rx));

    ActorHandle { session_id, cmd_tx }
}

struct ExecutionActor {
    shell: SessionShell,
    cursor: ProgressionCursor,
    phase: ExecutionPhase,
    /// Name and rest metadata keyed by exercise reference string
    exercise_meta: HashMap<String, ExerciseMeta>,
    state: Arc<SharedState>,
    event_tx: mpsc::Sender<ActorEvent>,
    /// Weak handle to our own mailbox, used by rest timer tasks. Weak so
    /// the actor does not keep itself alive after the caller is gone.
    self_tx: mpsc::WeakSender<ActorCommand>,
    /// Bumped every time a rest period starts or is cut short; a timer
    /// firing for an older generation is stale and ignored
    rest_generation: u64,
    rest_deadline: Option<Instant>,
    /// Outstanding metadata requests, keyed by request id and pointing at
    /// the slot awaiting the reply. List edits keep the indices current so
    /// a reply always lands on the slot that asked, wherever it moved to.
    pending_resolutions: HashMap<Uuid, usize>,
}

enum Flow {
    Continue,
    Stop,
}

impl ExecutionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<ActorCommand>) {
        while let Some(cmd) = cmd_rx.recv().await {
            if let Flow::Stop = self.handle(cmd).await {
                return;
            }
        }
        // The mailbox should only close after a terminal command; getting
        // here means the orchestrator side went away mid-workout
        warn!(session_id = %self.shell.id, "command channel closed mid-workout");
        let _ = self
            .event_tx
            .send(ActorEvent::Failed {
                message: "command channel closed mid-workout".to_string(),
            })
            .await;
    }

    async fn handle(&mut self, cmd: ActorCommand) -> Flow {
        match cmd {
            ActorCommand::CompleteSet {
                slot_index,
                overrides,
            } => self.complete_set(slot_index, overrides),
            ActorCommand::UncompleteSet {
                slot_index,
                set_number,
            } => self.uncomplete_set(slot_index, set_number),
            ActorCommand::EditSet {
                slot_index,
                set_number,
                overrides,
            } => self.edit_set(slot_index, set_number, overrides),
            ActorCommand::AddExtraSet => {
                self.shell.add_extra_set(self.cursor.slot_index);
                self.broadcast_slots();
            }
            ActorCommand::SkipRest => self.skip_rest(),
            ActorCommand::RestElapsed { generation } => self.rest_elapsed(generation),
            ActorCommand::NextExercise => self.navigate(|actor| {
                let cur = actor.cursor.slot_index;
                actor.cursor.jump(&actor.shell, cur + 1)
            }),
            ActorCommand::PreviousExercise => self.navigate(|actor| actor.cursor.retreat()),
            ActorCommand::JumpToExercise { slot_index } => {
                self.navigate(move |actor| actor.cursor.jump(&actor.shell, slot_index))
            }
            ActorCommand::AddExercise { slot } => self.add_exercise(slot).await,
            ActorCommand::SubstituteExercise {
                slot_index,
                replacement,
            } => self.substitute_exercise(slot_index, replacement).await,
            ActorCommand::RemoveExercise { slot_index } => self.remove_exercise(slot_index),
            ActorCommand::MoveExercise { from, to } => self.move_exercise(from, to),
            ActorCommand::ExerciseResolved {
                request_id,
                name,
                rest_secs,
            } => self.exercise_resolved(request_id, name, rest_secs),
            ActorCommand::Pause => {
                // Deliberate no-op. The intent is logged so the gap is
                // visible; rest timers keep running.
                info!(session_id = %self.shell.id, "pause requested, currently a no-op");
            }
            ActorCommand::Resume => {
                info!(session_id = %self.shell.id, "resume requested, currently a no-op");
            }
            ActorCommand::Complete { force } => return self.complete(force).await,
            ActorCommand::Cancel => return self.cancel().await,
            ActorCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
        Flow::Continue
    }

    // ------------------------------------------------------------------
    // Set recording
    // ------------------------------------------------------------------

    fn complete_set(&mut self, slot_index: Option<usize>, overrides: SetOverrides) {
        // Backfilling an explicit slot is allowed any time; the cursor's
        // current set is guarded against double-recording during rest
        let at_cursor = slot_index.map_or(true, |i| i == self.cursor.slot_index);
        if at_cursor && self.phase == ExecutionPhase::Resting {
            warn!(
                session_id = %self.shell.id,
                "complete_set rejected: rest period in progress"
            );
            return;
        }
        let slot_index = slot_index.unwrap_or(self.cursor.slot_index);
        let Some(slot) = self.shell.slots.get(slot_index).cloned() else {
            warn!(session_id = %self.shell.id, slot_index, "complete_set rejected: no such slot");
            return;
        };

        let (reps, weight_kg) = resolve_set_values(&slot, &overrides);
        let set_type = overrides.set_type.unwrap_or(SetType::Normal);
        let rpe = overrides.rpe;
        let set_number = self.shell.next_ordinal(slot_index);

        self.shell.record_set(CompletedSet {
            slot_index,
            set_number,
            reps,
            weight_kg,
            rpe,
            set_type,
            completed_at: Utc::now(),
        });
        info!(
            session_id = %self.shell.id,
            slot_index, set_number, reps, weight_kg,
            "set recorded"
        );
        self.state.broadcast_event(SessionEvent::SetCompleted {
            session_id: self.shell.id,
            slot_index,
            set_number,
            reps,
            weight_kg,
            timestamp: Utc::now(),
        });

        if at_cursor {
            let rest_base = self
                .exercise_meta
                .get(&slot.exercise_ref.to_string())
                .map(|m| m.rest_secs);
            self.start_rest(rest_duration_secs(rest_base, rpe, set_type));
        }
    }

    fn uncomplete_set(&mut self, slot_index: usize, set_number: u32) {
        if !self.shell.remove_set(slot_index, set_number) {
            warn!(
                session_id = %self.shell.id,
                slot_index, set_number,
                "uncomplete_set rejected: no such set"
            );
            return;
        }
        self.state.broadcast_event(SessionEvent::SetUncompleted {
            session_id: self.shell.id,
            slot_index,
            set_number,
            timestamp: Utc::now(),
        });
    }

    fn edit_set(&mut self, slot_index: usize, set_number: u32, overrides: SetOverrides) {
        let session_id = self.shell.id;
        let Some(set) = self.shell.find_set_mut(slot_index, set_number) else {
            warn!(
                session_id = %session_id,
                slot_index, set_number,
                "edit_set rejected: no such set"
            );
            return;
        };
        if let Some(reps) = overrides.reps {
            set.reps = reps;
        }
        if let Some(weight_kg) = overrides.weight_kg {
            set.weight_kg = weight_kg;
        }
        if let Some(rpe) = overrides.rpe {
            set.rpe = Some(rpe);
        }
        if let Some(set_type) = overrides.set_type {
            set.set_type = set_type;
        }
        let (reps, weight_kg) = (set.reps, set.weight_kg);
        self.state.broadcast_event(SessionEvent::SetCompleted {
            session_id,
            slot_index,
            set_number,
            reps,
            weight_kg,
            timestamp: Utc::now(),
        });
    }

    // ------------------------------------------------------------------
    // Rest timer
    // ------------------------------------------------------------------

    fn start_rest(&mut self, secs: u32) {
        self.phase = ExecutionPhase::Resting;
        self.rest_generation += 1;
        self.rest_deadline = Some(Instant::now() + Duration::from_secs(secs as u64));

        let tx = self.self_tx.clone();
        let generation = self.rest_generation;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs as u64)).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(ActorCommand::RestElapsed { generation }).await;
            }
        });

        self.state.broadcast_event(SessionEvent::RestStarted {
            session_id: self.shell.id,
            slot_index: self.cursor.slot_index,
            duration_ms: secs as u64 * 1000,
            timestamp: Utc::now(),
        });
    }

    fn rest_elapsed(&mut self, generation: u64) {
        if self.phase != ExecutionPhase::Resting || generation != self.rest_generation {
            debug!(
                session_id = %self.shell.id,
                generation,
                current = self.rest_generation,
                "stale rest timer ignored"
            );
            return;
        }
        self.end_rest(false);
    }

    fn skip_rest(&mut self) {
        if self.phase != ExecutionPhase::Resting {
            warn!(session_id = %self.shell.id, "skip_rest rejected: not resting");
            return;
        }
        self.end_rest(true);
    }

    fn end_rest(&mut self, skipped: bool) {
        // Invalidate any timer still in flight
        self.rest_generation += 1;
        self.rest_deadline = None;
        self.state.broadcast_event(SessionEvent::RestEnded {
            session_id: self.shell.id,
            skipped,
            timestamp: Utc::now(),
        });

        let slot_index = self.cursor.slot_index;
        let slot_done = self.shell.completed_in_slot(slot_index)
            >= self.shell.effective_planned_sets(slot_index);
        if slot_done && !self.cursor.is_last_exercise(&self.shell) {
            self.cursor.advance(&self.shell);
            self.phase = ExecutionPhase::BetweenExercises;
            self.broadcast_cursor();
        } else {
            self.phase = ExecutionPhase::PerformingSet;
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn navigate(&mut self, op: impl FnOnce(&mut Self) -> bool) {
        // Navigating away cuts any rest period short
        if self.phase == ExecutionPhase::Resting {
            self.rest_generation += 1;
            self.rest_deadline = None;
            self.state.broadcast_event(SessionEvent::RestEnded {
                session_id: self.shell.id,
                skipped: true,
                timestamp: Utc::now(),
            });
        }
        if !op(self) {
            warn!(
                session_id = %self.shell.id,
                slot_index = self.cursor.slot_index,
                "navigation rejected: out of range"
            );
            self.phase = ExecutionPhase::PerformingSet;
            return;
        }
        self.phase = ExecutionPhase::BetweenExercises;
        self.broadcast_cursor();
    }

    // ------------------------------------------------------------------
    // Exercise list edits
    // ------------------------------------------------------------------

    async fn add_exercise(&mut self, slot: ExerciseSlot) {
        let needs_resolution = slot.name.is_none();
        let exercise_ref = slot.exercise_ref.clone();
        let slot_index = self.shell.add_slot(slot);
        info!(session_id = %self.shell.id, slot_index, exercise = %exercise_ref, "exercise added");
        self.broadcast_slots();
        if needs_resolution {
            self.request_resolution(slot_index, exercise_ref).await;
        }
    }

    async fn substitute_exercise(&mut self, slot_index: usize, replacement: ExerciseSlot) {
        let needs_resolution = replacement.name.is_none();
        let exercise_ref = replacement.exercise_ref.clone();
        if !self.shell.substitute_slot(slot_index, replacement) {
            warn!(session_id = %self.shell.id, slot_index, "substitute rejected: no such slot");
            return;
        }
        // Any reply still in flight for the old occupant must not land on
        // the replacement
        self.pending_resolutions.retain(|_, idx| *idx != slot_index);
        self.broadcast_slots();
        if needs_resolution {
            self.request_resolution(slot_index, exercise_ref).await;
        }
    }

    fn remove_exercise(&mut self, slot_index: usize) {
        if !self.shell.remove_slot(slot_index) {
            warn!(session_id = %self.shell.id, slot_index, "remove rejected: no such slot");
            return;
        }
        self.pending_resolutions.retain(|_, idx| *idx != slot_index);
        for idx in self.pending_resolutions.values_mut() {
            if *idx > slot_index {
                *idx -= 1;
            }
        }
        self.cursor.clamp(&self.shell);
        self.broadcast_slots();
        self.broadcast_cursor();
    }

    fn move_exercise(&mut self, from: usize, to: usize) {
        if !self.shell.move_slot(from, to) {
            warn!(session_id = %self.shell.id, from, to, "move rejected: out of range");
            return;
        }
        // Cursor and pending resolutions follow the slots they point at
        let remap = |idx: usize| {
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
        self.cursor.slot_index = remap(self.cursor.slot_index);
        for idx in self.pending_resolutions.values_mut() {
            *idx = remap(*idx);
        }
        self.broadcast_slots();
    }

    async fn request_resolution(&mut self, slot_index: usize, exercise_ref: TemplateRef) {
        let request_id = Uuid::new_v4();
        self.pending_resolutions.insert(request_id, slot_index);
        let _ = self
            .event_tx
            .send(ActorEvent::ResolveExercise {
                request_id,
                exercise_ref,
            })
            .await;
    }

    fn exercise_resolved(
        &mut self,
        request_id: Uuid,
        name: Option<String>,
        rest_secs: Option<u32>,
    ) {
        // The pending table is the authority on where the reply belongs;
        // the slot may have been removed or substituted away meanwhile
        let Some(slot_index) = self.pending_resolutions.remove(&request_id) else {
            debug!(
                session_id = %self.shell.id,
                %request_id,
                "resolution result with no pending request ignored"
            );
            return;
        };
        let Some(slot) = self.shell.slots.get_mut(slot_index) else {
            debug!(
                session_id = %self.shell.id,
                %request_id, slot_index,
                "resolution result for vanished slot ignored"
            );
            return;
        };
        if let Some(name) = name.clone() {
            slot.name = Some(name);
        }
        let key = slot.exercise_ref.to_string();
        if name.is_some() || rest_secs.is_some() {
            let meta = self.exercise_meta.entry(key).or_insert(ExerciseMeta {
                name: String::new(),
                rest_secs: 90,
            });
            if let Some(n) = name {
                meta.name = n;
            }
            if let Some(r) = rest_secs {
                meta.rest_secs = r;
            }
        }
        self.broadcast_slots();
    }

    // ------------------------------------------------------------------
    // Terminal commands
    // ------------------------------------------------------------------

    async fn complete(&mut self, force: bool) -> Flow {
        if self.shell.total_sets() == 0 && !force {
            warn!(
                session_id = %self.shell.id,
                "complete rejected: no sets recorded (force to override)"
            );
            return Flow::Continue;
        }
        self.shell.ended_at = Some(Utc::now());
        let duration_secs = self
            .shell
            .ended_at
            .map(|end| (end - self.shell.started_at).num_seconds())
            .unwrap_or(0);
        info!(
            session_id = %self.shell.id,
            sets = self.shell.total_sets(),
            duration_secs,
            "workout complete"
        );
        self.state.broadcast_event(SessionEvent::WorkoutCompleted {
            session_id: self.shell.id,
            set_count: self.shell.total_sets(),
            duration_secs,
            timestamp: Utc::now(),
        });
        let outcome = std::mem::replace(&mut self.shell, SessionShell::new(String::new()));
        let _ = self.event_tx.send(ActorEvent::Completed { outcome }).await;
        Flow::Stop
    }

    async fn cancel(&mut self) -> Flow {
        info!(session_id = %self.shell.id, "workout cancelled");
        self.state.broadcast_event(SessionEvent::WorkoutCancelled {
            session_id: self.shell.id,
            timestamp: Utc::now(),
        });
        let _ = self.event_tx.send(ActorEvent::Cancelled).await;
        Flow::Stop
    }

    // ------------------------------------------------------------------
    // Reads and event helpers
    // ------------------------------------------------------------------

    fn snapshot(&self) -> SessionSnapshot {
        let slots = self
            .shell
            .slots
            .iter()
            .enumerate()
            .map(|(slot_index, slot)| {
                let mut sets: Vec<SetSnapshot> = self
                    .shell
                    .completed_sets
                    .iter()
                    .filter(|s| s.slot_index == slot_index)
                    .map(|s| SetSnapshot {
                        set_number: s.set_number,
                        reps: s.reps,
                        weight_kg: s.weight_kg,
                        rpe: s.rpe,
                        set_type: s.set_type,
                    })
                    .collect();
                sets.sort_by_key(|s| s.set_number);
                SlotSnapshot {
                    slot_index,
                    exercise_ref: slot.exercise_ref.to_string(),
                    name: slot.name.clone(),
                    planned_sets: self.shell.effective_planned_sets(slot_index),
                    completed_sets: self.shell.completed_in_slot(slot_index),
                    sets,
                }
            })
            .collect();

        SessionSnapshot {
            session_id: self.shell.id,
            title: self.shell.title.clone(),
            started_at: self.shell.started_at,
            phase: self.phase,
            slot_index: self.cursor.slot_index,
            current_set_number: self.cursor.current_set_number(&self.shell),
            slots,
            total_completed_sets: self.shell.total_sets(),
            rest_remaining_secs: self
                .rest_deadline
                .map(|d| d.saturating_duration_since(Instant::now()).as_secs()),
        }
    }

    fn slot_infos(&self) -> Vec<SlotInfo> {
        self.shell
            .slots
            .iter()
            .enumerate()
            .map(|(slot_index, slot)| SlotInfo {
                slot_index,
                exercise_ref: slot.exercise_ref.to_string(),
                name: slot.name.clone(),
                planned_sets: self.shell.effective_planned_sets(slot_index),
                completed_sets: self.shell.completed_in_slot(slot_index),
            })
            .collect()
    }

    fn broadcast_slots(&self) {
        self.state.broadcast_event(SessionEvent::SlotListChanged {
            session_id: self.shell.id,
            slots: self.slot_infos(),
            timestamp: Utc::now(),
        });
    }

    fn broadcast_cursor(&self) {
        self.state.broadcast_event(SessionEvent::CursorMoved {
            session_id: self.shell.id,
            slot_index: self.cursor.slot_index,
            set_number: self.cursor.current_set_number(&self.shell),
            timestamp: Utc::now(),
        });
    }
}
