//! Workout lifecycle orchestrator
//!
//! Parent of the whole session lifecycle: owns the setup coordinator
//! while a template is being chosen, the execution actor handle while a
//! workout runs, and the finished shell through publication. Exactly one
//! session exists at a time; exactly one publication attempt happens per
//! completed workout unless the user explicitly retries a failure.

use crate::error::{Error, Result};
use crate::publish::build_record;
use crate::publisher::{EventPublisher, PublishOutcome};
use crate::resolver::{TemplateResolver, TemplateSummary};
use crate::session::actor::{self, ActorHandle, SeedDraft};
use crate::session::commands::{ActorCommand, ActorEvent, SessionSnapshot, SetOverrides};
use crate::session::shell::{ExerciseSlot, SessionShell};
use crate::setup::SetupCoordinator;
use crate::state::SharedState;
use chrono::Utc;
use setlog_common::events::SessionEvent;
use setlog_common::TemplateRef;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{error, info, warn};

/// Lifecycle phase, externally visible
enum Phase {
    Idle,
    Setup { coordinator: SetupCoordinator },
    /// Template confirmed; seed assembled but the actor not yet spawned
    SetupComplete { draft: SeedDraft },
    Active {
        handle: ActorHandle,
        template_ref: TemplateRef,
    },
    /// Workout finished; publication in flight or about to be
    Completed,
    /// Record accepted by the publisher (or error dismissed)
    Published { record_id: Option<String> },
    /// Publication failed; dismissible, retryable
    PublishError {
        shell: SessionShell,
        template_ref: TemplateRef,
        error: String,
    },
    /// The execution actor died unexpectedly
    Faulted { error: String },
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Setup { .. } => "setup",
            Phase::SetupComplete { .. } => "setup_complete",
            Phase::Active { .. } => "active",
            Phase::Completed => "completed",
            Phase::Published { .. } => "published",
            Phase::PublishError { .. } => "publish_error",
            Phase::Faulted { .. } => "faulted",
        }
    }
}

pub struct WorkoutOrchestrator {
    state: Arc<SharedState>,
    resolver: Arc<dyn TemplateResolver>,
    publisher: Arc<dyn EventPublisher>,
    user_identity: String,
    phase: Mutex<Phase>,
}

impl WorkoutOrchestrator {
    pub fn new(
        state: Arc<SharedState>,
        resolver: Arc<dyn TemplateResolver>,
        publisher: Arc<dyn EventPublisher>,
        user_identity: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            resolver,
            publisher,
            user_identity,
            phase: Mutex::new(Phase::Idle),
        })
    }

    /// Current lifecycle phase name, for status reporting
    pub async fn phase_name(&self) -> &'static str {
        self.phase.lock().await.name()
    }

    /// Extra status detail: record id once published, error text when the
    /// lifecycle is stuck in a failure phase
    pub async fn phase_detail(&self) -> Option<String> {
        match &*self.phase.lock().await {
            Phase::Published { record_id } => record_id.clone(),
            Phase::PublishError { error, .. } => Some(error.clone()),
            Phase::Faulted { error } => Some(error.clone()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Start a new session, optionally with a preselected template.
    /// References are normalized before any state is entered, so a
    /// malformed duplication never reaches the published record.
    pub async fn start_session(self: &Arc<Self>, preselected_raw: Option<&str>) -> Result<()> {
        let preselected = match preselected_raw {
            Some(raw) => Some(TemplateRef::normalize(raw).map_err(Error::from)?),
            None => None,
        };

        let mut phase = self.phase.lock().await;
        match &*phase {
            Phase::Idle | Phase::Published { .. } | Phase::Faulted { .. } => {}
            other => {
                return Err(Error::InvalidState(format!(
                    "cannot start a session while {}",
                    other.name()
                )))
            }
        }

        let mut coordinator =
            SetupCoordinator::new(self.resolver.clone(), self.user_identity.clone());
        coordinator.begin(preselected).await?;
        *phase = Phase::Setup { coordinator };
        drop(phase);
        self.broadcast_phase().await;
        Ok(())
    }

    /// Templates available for selection during setup
    pub async fn available_templates(&self) -> Result<Vec<TemplateSummary>> {
        let phase = self.phase.lock().await;
        match &*phase {
            Phase::Setup { coordinator, .. } => Ok(coordinator
                .available()
                .map(|a| a.to_vec())
                .unwrap_or_default()),
            other => Err(Error::InvalidState(format!(
                "no setup in progress ({})",
                other.name()
            ))),
        }
    }

    pub async fn select_template(&self, raw: &str) -> Result<()> {
        let reference = TemplateRef::normalize(raw).map_err(Error::from)?;
        let mut phase = self.phase.lock().await;
        match &mut *phase {
            Phase::Setup { coordinator, .. } => coordinator.select(reference).await,
            other => Err(Error::InvalidState(format!(
                "no setup in progress ({})",
                other.name()
            ))),
        }
    }

    pub async fn retry_setup(&self) -> Result<()> {
        let mut phase = self.phase.lock().await;
        match &mut *phase {
            Phase::Setup { coordinator, .. } => coordinator.retry().await,
            other => Err(Error::InvalidState(format!(
                "no setup in progress ({})",
                other.name()
            ))),
        }
    }

    /// Confirm the loaded template, assembling the session seed
    pub async fn confirm_setup(&self) -> Result<()> {
        let mut phase = self.phase.lock().await;
        let Phase::Setup { coordinator, .. } = &mut *phase else {
            return Err(Error::InvalidState(format!(
                "no setup in progress ({})",
                phase.name()
            )));
        };

        let draft = coordinator.confirm()?;
        *phase = Phase::SetupComplete { draft };
        drop(phase);
        self.broadcast_phase().await;
        Ok(())
    }

    /// Validate the confirmed seed and spawn the execution actor. A seed
    /// that fails validation is fatal for this session; the lifecycle
    /// lands in the faulted phase and a new session must be started.
    pub async fn begin_session(self: &Arc<Self>) -> Result<()> {
        let mut phase = self.phase.lock().await;
        let Phase::SetupComplete { .. } = &*phase else {
            return Err(Error::InvalidState(format!(
                "setup not confirmed ({})",
                phase.name()
            )));
        };
        let Phase::SetupComplete { draft } = std::mem::replace(&mut *phase, Phase::Idle) else {
            unreachable!()
        };

        let seed = match draft.validate() {
            Ok(seed) => seed,
            Err(faults) => {
                let err = Error::Validation(faults);
                *phase = Phase::Faulted {
                    error: err.to_string(),
                };
                return Err(err);
            }
        };
        let template_ref = seed.template_ref.clone();

        let (event_tx, event_rx) = mpsc::channel(64);
        let handle = actor::spawn(seed, self.state.clone(), event_tx);
        let cmd_tx = handle.cmd_tx.clone();
        *phase = Phase::Active {
            handle,
            template_ref,
        };
        drop(phase);

        tokio::spawn(self.clone().pump_actor_events(event_rx, cmd_tx));
        self.broadcast_phase().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Actor event pump
    // ------------------------------------------------------------------

    /// Consume the actor's outbound events until it terminates. Also
    /// brokers exercise-metadata resolution so the actor never blocks on
    /// the resolver.
    async fn pump_actor_events(
        self: Arc<Self>,
        mut event_rx: mpsc::Receiver<ActorEvent>,
        cmd_tx: mpsc::Sender<ActorCommand>,
    ) {
        while let Some(event) = event_rx.recv().await {
            match event {
                ActorEvent::ResolveExercise {
                    request_id,
                    exercise_ref,
                } => {
                    let resolver = self.resolver.clone();
                    let cmd_tx = cmd_tx.clone();
                    tokio::spawn(async move {
                        let (name, rest_secs) = match resolver.resolve_exercise(&exercise_ref).await
                        {
                            Ok(def) => (Some(def.name), Some(def.rest_secs)),
                            Err(e) => {
                                warn!(exercise = %exercise_ref, error = %e, "exercise resolution failed");
                                (None, None)
                            }
                        };
                        let _ = cmd_tx
                            .send(ActorCommand::ExerciseResolved {
                                request_id,
                                name,
                                rest_secs,
                            })
                            .await;
                    });
                }
                ActorEvent::Completed { outcome } => {
                    self.on_workout_completed(outcome).await;
                    return;
                }
                ActorEvent::Cancelled => {
                    let mut phase = self.phase.lock().await;
                    *phase = Phase::Idle;
                    drop(phase);
                    self.broadcast_phase().await;
                    return;
                }
                ActorEvent::Failed { message } => {
                    error!(error = %message, "execution actor failed");
                    let mut phase = self.phase.lock().await;
                    *phase = Phase::Faulted { error: message };
                    drop(phase);
                    self.broadcast_phase().await;
                    return;
                }
            }
        }
    }

    /// Shell handed back by the actor: move to completed and publish once
    async fn on_workout_completed(&self, shell: SessionShell) {
        let template_ref = {
            let mut phase = self.phase.lock().await;
            let Phase::Active { template_ref, .. } = &*phase else {
                warn!(phase = phase.name(), "completion in unexpected phase");
                return;
            };
            let template_ref = template_ref.clone();
            *phase = Phase::Completed;
            template_ref
        };
        self.broadcast_phase().await;
        self.attempt_publish(shell, template_ref).await;
    }

    async fn attempt_publish(&self, shell: SessionShell, template_ref: TemplateRef) {
        let session_id = shell.id;
        let record = build_record(&shell, &template_ref);
        let outcome = self.publisher.publish(&record).await;

        let mut phase = self.phase.lock().await;
        match outcome {
            Ok(PublishOutcome::Accepted { id }) => {
                info!(session_id = %session_id, record_id = ?id, "workout record published");
                self.state.broadcast_event(SessionEvent::RecordPublished {
                    session_id,
                    record_id: id.clone(),
                    timestamp: Utc::now(),
                });
                *phase = Phase::Published { record_id: id };
            }
            Ok(PublishOutcome::Rejected { error }) | Err(Error::Publication(error)) => {
                warn!(session_id = %session_id, error = %error, "publication failed");
                self.state.broadcast_event(SessionEvent::PublishFailed {
                    session_id,
                    error: error.clone(),
                    timestamp: Utc::now(),
                });
                *phase = Phase::PublishError {
                    shell,
                    template_ref,
                    error,
                };
            }
            Err(e) => {
                let error = e.to_string();
                warn!(session_id = %session_id, error = %error, "publication failed");
                self.state.broadcast_event(SessionEvent::PublishFailed {
                    session_id,
                    error: error.clone(),
                    timestamp: Utc::now(),
                });
                *phase = Phase::PublishError {
                    shell,
                    template_ref,
                    error,
                };
            }
        }
        drop(phase);
        self.broadcast_phase().await;
    }

    /// Retry a failed publication
    pub async fn retry_publish(&self) -> Result<()> {
        let (shell, template_ref) = {
            let mut phase = self.phase.lock().await;
            let Phase::PublishError { .. } = &*phase else {
                return Err(Error::InvalidState(format!(
                    "no failed publication to retry ({})",
                    phase.name()
                )));
            };
            let Phase::PublishError {
                shell,
                template_ref,
                ..
            } = std::mem::replace(&mut *phase, Phase::Completed)
            else {
                unreachable!()
            };
            (shell, template_ref)
        };
        self.attempt_publish(shell, template_ref).await;
        Ok(())
    }

    /// Give up on a failed publication. The workout stays completed; the
    /// record is simply never sent.
    pub async fn dismiss_publish_error(&self) -> Result<()> {
        let mut phase = self.phase.lock().await;
        match &*phase {
            Phase::PublishError { shell, .. } => {
                info!(session_id = %shell.id, "publish error dismissed");
                *phase = Phase::Published { record_id: None };
                drop(phase);
                self.broadcast_phase().await;
                Ok(())
            }
            other => Err(Error::InvalidState(format!(
                "no publish error to dismiss ({})",
                other.name()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Active-session proxies
    // ------------------------------------------------------------------

    async fn send_active(&self, cmd: ActorCommand) -> Result<()> {
        let phase = self.phase.lock().await;
        match &*phase {
            Phase::Active { handle, .. } => handle
                .cmd_tx
                .send(cmd)
                .await
                .map_err(|_| Error::Session("execution actor is gone".into())),
            other => Err(Error::InvalidState(format!(
                "no active session ({})",
                other.name()
            ))),
        }
    }

    pub async fn complete_set(
        &self,
        slot_index: Option<usize>,
        overrides: SetOverrides,
    ) -> Result<()> {
        self.send_active(ActorCommand::CompleteSet {
            slot_index,
            overrides,
        })
        .await
    }

    pub async fn uncomplete_set(&self, slot_index: usize, set_number: u32) -> Result<()> {
        self.send_active(ActorCommand::UncompleteSet {
            slot_index,
            set_number,
        })
        .await
    }

    pub async fn edit_set(
        &self,
        slot_index: usize,
        set_number: u32,
        overrides: SetOverrides,
    ) -> Result<()> {
        self.send_active(ActorCommand::EditSet {
            slot_index,
            set_number,
            overrides,
        })
        .await
    }

    pub async fn add_extra_set(&self) -> Result<()> {
        self.send_active(ActorCommand::AddExtraSet).await
    }

    pub async fn skip_rest(&self) -> Result<()> {
        self.send_active(ActorCommand::SkipRest).await
    }

    pub async fn next_exercise(&self) -> Result<()> {
        self.send_active(ActorCommand::NextExercise).await
    }

    pub async fn previous_exercise(&self) -> Result<()> {
        self.send_active(ActorCommand::PreviousExercise).await
    }

    pub async fn jump_to_exercise(&self, slot_index: usize) -> Result<()> {
        self.send_active(ActorCommand::JumpToExercise { slot_index })
            .await
    }

    /// Add an exercise mid-session. The reference is normalized here;
    /// name and rest metadata arrive later through the resolution broker.
    pub async fn add_exercise(&self, raw_ref: &str, planned_sets: Option<u32>) -> Result<()> {
        let exercise_ref = TemplateRef::normalize(raw_ref).map_err(Error::from)?;
        self.send_active(ActorCommand::AddExercise {
            slot: unresolved_slot(exercise_ref, planned_sets),
        })
        .await
    }

    pub async fn substitute_exercise(&self, slot_index: usize, raw_ref: &str) -> Result<()> {
        let exercise_ref = TemplateRef::normalize(raw_ref).map_err(Error::from)?;
        self.send_active(ActorCommand::SubstituteExercise {
            slot_index,
            replacement: unresolved_slot(exercise_ref, None),
        })
        .await
    }

    pub async fn remove_exercise(&self, slot_index: usize) -> Result<()> {
        self.send_active(ActorCommand::RemoveExercise { slot_index })
            .await
    }

    pub async fn move_exercise(&self, from: usize, to: usize) -> Result<()> {
        self.send_active(ActorCommand::MoveExercise { from, to }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send_active(ActorCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send_active(ActorCommand::Resume).await
    }

    pub async fn complete_workout(&self, force: bool) -> Result<()> {
        self.send_active(ActorCommand::Complete { force }).await
    }

    /// Cancel whatever is in progress. Setup collapses straight back to
    /// idle; an active workout is told to cancel and the actor's
    /// notification finishes the transition.
    pub async fn cancel(&self) -> Result<()> {
        let mut phase = self.phase.lock().await;
        match &*phase {
            Phase::Setup { .. } | Phase::SetupComplete { .. } => {
                *phase = Phase::Idle;
                drop(phase);
                self.broadcast_phase().await;
                Ok(())
            }
            Phase::Active { handle, .. } => handle
                .cmd_tx
                .send(ActorCommand::Cancel)
                .await
                .map_err(|_| Error::Session("execution actor is gone".into())),
            other => Err(Error::InvalidState(format!(
                "nothing to cancel ({})",
                other.name()
            ))),
        }
    }

    /// Ordered snapshot of the active session
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let reply_rx = {
            let phase = self.phase.lock().await;
            let Phase::Active { handle, .. } = &*phase else {
                return Err(Error::InvalidState(format!(
                    "no active session ({})",
                    phase.name()
                )));
            };
            let (tx, rx) = oneshot::channel();
            handle
                .cmd_tx
                .send(ActorCommand::Snapshot { reply: tx })
                .await
                .map_err(|_| Error::Session("execution actor is gone".into()))?;
            rx
        };
        reply_rx
            .await
            .map_err(|_| Error::Session("execution actor is gone".into()))
    }

    async fn broadcast_phase(&self) {
        let name = self.phase_name().await;
        self.state.broadcast_event(SessionEvent::LifecycleStateChanged {
            state: name.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Slot for a mid-session addition, before metadata resolution
fn unresolved_slot(exercise_ref: TemplateRef, planned_sets: Option<u32>) -> ExerciseSlot {
    ExerciseSlot {
        exercise_ref,
        name: None,
        planned_sets: planned_sets.unwrap_or(3),
        planned_reps: 10,
        planned_weight_kg: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ExerciseDef, ResolvedTemplate, TemplateEntry, WorkoutTemplate};
    use async_trait::async_trait;
    use setlog_common::record::WorkoutRecord;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::time::{sleep, Duration};

    struct StubResolver;

    #[async_trait]
    impl TemplateResolver for StubResolver {
        async fn resolve(&self, reference: &TemplateRef) -> Result<ResolvedTemplate> {
            let exercise_ref = TemplateRef::new("33401", "npub-a", "bench");
            Ok(ResolvedTemplate {
                template: WorkoutTemplate {
                    reference: reference.clone(),
                    title: "Push Day".to_string(),
                    entries: vec![TemplateEntry {
                        exercise_ref: exercise_ref.clone(),
                        planned_sets: Some(1),
                        planned_reps: Some(5),
                        planned_weight_kg: Some(60.0),
                    }],
                },
                exercise_defs: vec![ExerciseDef {
                    reference: exercise_ref,
                    name: "Bench Press".to_string(),
                    rest_secs: 60,
                }],
                latency_ms: 1,
            })
        }

        async fn list_by_author(&self, _author: &str) -> Result<Vec<TemplateSummary>> {
            Ok(Vec::new())
        }

        async fn resolve_exercise(&self, reference: &TemplateRef) -> Result<ExerciseDef> {
            Ok(ExerciseDef {
                reference: reference.clone(),
                name: "Resolved Exercise".to_string(),
                rest_secs: 120,
            })
        }
    }

    struct RecordingPublisher {
        fail_next: AtomicBool,
        records: StdMutex<Vec<WorkoutRecord>>,
    }

    impl RecordingPublisher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail_next: AtomicBool::new(false),
                records: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, record: &WorkoutRecord) -> Result<PublishOutcome> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Ok(PublishOutcome::Rejected {
                    error: "transport refused".to_string(),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(PublishOutcome::Accepted {
                id: Some("rec-1".to_string()),
            })
        }
    }

    fn orchestrator(
        publisher: Arc<RecordingPublisher>,
    ) -> Arc<WorkoutOrchestrator> {
        WorkoutOrchestrator::new(
            Arc::new(SharedState::new()),
            Arc::new(StubResolver),
            publisher,
            "npub-user".to_string(),
        )
    }

    async fn run_to_active(orch: &Arc<WorkoutOrchestrator>) {
        orch.start_session(Some("33402:npub-a:push")).await.unwrap();
        orch.confirm_setup().await.unwrap();
        orch.begin_session().await.unwrap();
        assert_eq!(orch.phase_name().await, "active");
    }

    async fn wait_for_phase(orch: &Arc<WorkoutOrchestrator>, want: &str) {
        for _ in 0..100 {
            if orch.phase_name().await == want {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("never reached phase {want}, stuck at {}", orch.phase_name().await);
    }

    #[tokio::test]
    async fn test_full_lifecycle_publishes_once() {
        let publisher = RecordingPublisher::new();
        let orch = orchestrator(publisher.clone());

        run_to_active(&orch).await;
        orch.complete_set(None, SetOverrides::default()).await.unwrap();
        orch.complete_workout(true).await.unwrap();

        wait_for_phase(&orch, "published").await;
        let records = publisher.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "Push Day");
        let set_tags: Vec<_> = records[0].tags_named("set").collect();
        assert_eq!(set_tags.len(), 1);
        assert_eq!(set_tags[0][4], "5"); // prescribed reps flowed through
    }

    #[tokio::test]
    async fn test_malformed_preselection_is_normalized_before_setup() {
        let publisher = RecordingPublisher::new();
        let orch = orchestrator(publisher.clone());

        // Duplicated 5-part reference collapses before any state is entered
        orch.start_session(Some("33402:npub-a:33402:npub-a:push"))
            .await
            .unwrap();
        orch.confirm_setup().await.unwrap();
        orch.begin_session().await.unwrap();
        orch.complete_workout(true).await.unwrap();

        wait_for_phase(&orch, "published").await;
        let records = publisher.records.lock().unwrap();
        let template_tags: Vec<_> = records[0].tags_named("template").collect();
        assert_eq!(template_tags[0][1], "33402:npub-a:push");
    }

    #[tokio::test]
    async fn test_publish_failure_is_dismissible() {
        let publisher = RecordingPublisher::new();
        publisher.fail_next.store(true, Ordering::SeqCst);
        let orch = orchestrator(publisher.clone());

        run_to_active(&orch).await;
        orch.complete_workout(true).await.unwrap();
        wait_for_phase(&orch, "publish_error").await;

        orch.dismiss_publish_error().await.unwrap();
        assert_eq!(orch.phase_name().await, "published");
        assert!(publisher.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_retryable() {
        let publisher = RecordingPublisher::new();
        publisher.fail_next.store(true, Ordering::SeqCst);
        let orch = orchestrator(publisher.clone());

        run_to_active(&orch).await;
        orch.complete_set(None, SetOverrides::default()).await.unwrap();
        orch.complete_workout(true).await.unwrap();
        wait_for_phase(&orch, "publish_error").await;

        orch.retry_publish().await.unwrap();
        wait_for_phase(&orch, "published").await;
        assert_eq!(publisher.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_discards_without_publishing() {
        let publisher = RecordingPublisher::new();
        let orch = orchestrator(publisher.clone());

        run_to_active(&orch).await;
        orch.complete_set(None, SetOverrides::default()).await.unwrap();
        orch.cancel().await.unwrap();

        wait_for_phase(&orch, "idle").await;
        assert!(publisher.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operations_outside_active_are_rejected() {
        let orch = orchestrator(RecordingPublisher::new());
        assert!(matches!(
            orch.complete_set(None, SetOverrides::default()).await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(orch.snapshot().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_confirm_parks_in_setup_complete() {
        let orch = orchestrator(RecordingPublisher::new());
        orch.start_session(Some("33402:npub-a:push")).await.unwrap();
        orch.confirm_setup().await.unwrap();
        assert_eq!(orch.phase_name().await, "setup_complete");

        // Backing out before the actor spawns is a plain cancel
        orch.cancel().await.unwrap();
        assert_eq!(orch.phase_name().await, "idle");
    }

    #[tokio::test]
    async fn test_second_session_requires_terminal_phase() {
        let orch = orchestrator(RecordingPublisher::new());
        run_to_active(&orch).await;
        assert!(matches!(
            orch.start_session(None).await,
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_mid_session_addition_gets_resolved_metadata() {
        let orch = orchestrator(RecordingPublisher::new());
        run_to_active(&orch).await;

        orch.add_exercise("33401:npub-a:curl", None).await.unwrap();
        // Resolution round-trips through the broker task
        sleep(Duration::from_millis(50)).await;

        let snap = orch.snapshot().await.unwrap();
        assert_eq!(snap.slots.len(), 2);
        assert_eq!(snap.slots[1].name.as_deref(), Some("Resolved Exercise"));
    }
}
