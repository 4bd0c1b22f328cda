//! Setup coordinator
//!
//! Drives the pre-workout phase: pick a template (or honor a
//! preselection), resolve it and its exercise definitions through the
//! resolver collaborator, build the exercise slots, and hand a seed draft
//! to the orchestrator on confirmation.
//!
//! Resolution failures land in a retryable error state rather than
//! aborting setup; the caller decides when to retry.

use crate::error::{Error, Result};
use crate::resolver::{ResolvedTemplate, TemplateResolver, TemplateSummary};
use crate::session::actor::{ExerciseMeta, SeedDraft};
use crate::session::shell::ExerciseSlot;
use setlog_common::TemplateRef;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_PLANNED_SETS: u32 = 3;
const DEFAULT_PLANNED_REPS: u32 = 10;

/// Where the setup phase currently stands
#[derive(Debug, Clone)]
pub enum SetupPhase {
    /// Deciding whether a preselected template shortcuts the picker
    CheckingPreselection,
    /// Waiting for the available-template listing
    ListingAvailable,
    /// Listing shown, waiting for the user to pick
    Selecting { available: Vec<TemplateSummary> },
    /// Resolving the chosen template
    Loading { reference: TemplateRef },
    /// Template resolved, awaiting confirmation
    Loaded { reference: TemplateRef },
    /// Resolution failed; `retry` re-runs the load
    Failed { reference: TemplateRef, error: String },
    /// Seed handed off
    Confirmed,
}

impl SetupPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SetupPhase::CheckingPreselection => "checking_preselection",
            SetupPhase::ListingAvailable => "listing_available",
            SetupPhase::Selecting { .. } => "selecting",
            SetupPhase::Loading { .. } => "loading",
            SetupPhase::Loaded { .. } => "loaded",
            SetupPhase::Failed { .. } => "failed",
            SetupPhase::Confirmed => "confirmed",
        }
    }
}

/// Coordinates template selection and resolution for one session start
pub struct SetupCoordinator {
    resolver: Arc<dyn TemplateResolver>,
    user_identity: String,
    phase: SetupPhase,
    resolved: Option<ResolvedTemplate>,
}

impl SetupCoordinator {
    pub fn new(resolver: Arc<dyn TemplateResolver>, user_identity: String) -> Self {
        Self {
            resolver,
            user_identity,
            phase: SetupPhase::CheckingPreselection,
            resolved: None,
        }
    }

    pub fn phase(&self) -> &SetupPhase {
        &self.phase
    }

    /// Begin setup. A preselected template skips the listing step and
    /// loads directly; otherwise the author's templates are listed for
    /// selection.
    pub async fn begin(&mut self, preselected: Option<TemplateRef>) -> Result<()> {
        match preselected {
            Some(reference) => {
                info!(template = %reference, "preselected template, skipping picker");
                self.load(reference).await
            }
            None => {
                self.phase = SetupPhase::ListingAvailable;
                let available = self.resolver.list_by_author(&self.user_identity).await?;
                info!(count = available.len(), "templates listed");
                self.phase = SetupPhase::Selecting { available };
                Ok(())
            }
        }
    }

    /// Templates offered for selection, if the listing step has run
    pub fn available(&self) -> Option<&[TemplateSummary]> {
        match &self.phase {
            SetupPhase::Selecting { available } => Some(available),
            _ => None,
        }
    }

    /// User picked a template from the listing
    pub async fn select(&mut self, reference: TemplateRef) -> Result<()> {
        match &self.phase {
            SetupPhase::Selecting { .. } => self.load(reference).await,
            other => Err(Error::InvalidState(format!(
                "cannot select a template while {}",
                other.name()
            ))),
        }
    }

    /// Re-run a failed resolution
    pub async fn retry(&mut self) -> Result<()> {
        match &self.phase {
            SetupPhase::Failed { reference, .. } => {
                let reference = reference.clone();
                info!(template = %reference, "retrying template resolution");
                self.load(reference).await
            }
            other => Err(Error::InvalidState(format!(
                "nothing to retry while {}",
                other.name()
            ))),
        }
    }

    async fn load(&mut self, reference: TemplateRef) -> Result<()> {
        self.phase = SetupPhase::Loading {
            reference: reference.clone(),
        };
        match self.resolver.resolve(&reference).await {
            Ok(resolved) => {
                info!(
                    template = %reference,
                    exercises = resolved.template.entries.len(),
                    latency_ms = resolved.latency_ms,
                    "template resolved"
                );
                self.resolved = Some(resolved);
                self.phase = SetupPhase::Loaded { reference };
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                warn!(template = %reference, error = %e, "template resolution failed");
                self.phase = SetupPhase::Failed {
                    reference,
                    error: e.to_string(),
                };
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Confirm the loaded template and produce the seed draft. Slot values
    /// come from the template prescription where present, otherwise the
    /// defaults of 3 sets of 10 at bodyweight.
    pub fn confirm(&mut self) -> Result<SeedDraft> {
        let SetupPhase::Loaded { reference } = &self.phase else {
            return Err(Error::InvalidState(format!(
                "cannot confirm while {}",
                self.phase.name()
            )));
        };
        let reference = reference.clone();
        let resolved = self
            .resolved
            .take()
            .ok_or_else(|| Error::Internal("loaded phase without a resolved template".into()))?;

        let defs_by_ref: HashMap<String, _> = resolved
            .exercise_defs
            .iter()
            .map(|d| (d.reference.to_string(), d))
            .collect();

        let slots = resolved
            .template
            .entries
            .iter()
            .map(|entry| {
                let def = defs_by_ref.get(&entry.exercise_ref.to_string());
                ExerciseSlot {
                    exercise_ref: entry.exercise_ref.clone(),
                    name: def.map(|d| d.name.clone()),
                    planned_sets: entry.planned_sets.unwrap_or(DEFAULT_PLANNED_SETS),
                    planned_reps: entry.planned_reps.unwrap_or(DEFAULT_PLANNED_REPS),
                    planned_weight_kg: entry.planned_weight_kg.unwrap_or(0.0),
                }
            })
            .collect();

        let exercise_meta = resolved
            .exercise_defs
            .iter()
            .map(|d| {
                (
                    d.reference.to_string(),
                    ExerciseMeta {
                        name: d.name.clone(),
                        rest_secs: d.rest_secs,
                    },
                )
            })
            .collect();

        self.phase = SetupPhase::Confirmed;
        Ok(SeedDraft {
            user_identity: Some(self.user_identity.clone()),
            shell_title: Some(resolved.template.title.clone()),
            template_ref: Some(reference),
            slots: Some(slots),
            exercise_meta: Some(exercise_meta),
        })
    }
}
