//! Template resolution
//!
//! The template resolver is an external collaborator with a narrow contract:
//! given a canonical reference it returns the template plus every exercise
//! definition the template mentions, or a classified error. The service
//! binary ships a TOML-library-backed implementation; tests substitute fakes
//! through the same trait.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use setlog_common::TemplateRef;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One exercise definition, resolvable by reference
#[derive(Debug, Clone)]
pub struct ExerciseDef {
    pub reference: TemplateRef,
    pub name: String,
    /// Baseline rest between sets, seconds
    pub rest_secs: u32,
}

/// One exercise entry in a template, with optional prescription
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub exercise_ref: TemplateRef,
    pub planned_sets: Option<u32>,
    pub planned_reps: Option<u32>,
    pub planned_weight_kg: Option<f64>,
}

/// A workout template
#[derive(Debug, Clone)]
pub struct WorkoutTemplate {
    pub reference: TemplateRef,
    pub title: String,
    pub entries: Vec<TemplateEntry>,
}

/// Template plus every exercise definition it references
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub template: WorkoutTemplate,
    pub exercise_defs: Vec<ExerciseDef>,
    /// Resolution latency reported by the collaborator
    pub latency_ms: u64,
}

/// Listing summary for author-scoped queries
#[derive(Debug, Clone)]
pub struct TemplateSummary {
    pub reference: TemplateRef,
    pub title: String,
}

/// Template resolver collaborator contract
///
/// `resolve` is all-or-nothing: a template whose exercise definitions cannot
/// all be found resolves to an error, never a partial result.
#[async_trait]
pub trait TemplateResolver: Send + Sync {
    /// Resolve a template and all of its exercise definitions
    async fn resolve(&self, reference: &TemplateRef) -> Result<ResolvedTemplate>;

    /// List templates published by one author
    async fn list_by_author(&self, author: &str) -> Result<Vec<TemplateSummary>>;

    /// Resolve a single exercise definition (used by the orchestrator to
    /// broker metadata for in-session exercise additions)
    async fn resolve_exercise(&self, reference: &TemplateRef) -> Result<ExerciseDef>;
}

// ============================================================================
// TOML library resolver (the binary's built-in collaborator)
// ============================================================================

#[derive(Debug, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    exercises: Vec<ExerciseFileEntry>,
    #[serde(default)]
    templates: Vec<TemplateFileEntry>,
}

#[derive(Debug, Deserialize)]
struct ExerciseFileEntry {
    #[serde(rename = "ref")]
    reference: String,
    name: String,
    #[serde(default = "default_rest_secs")]
    rest_secs: u32,
}

#[derive(Debug, Deserialize)]
struct TemplateFileEntry {
    #[serde(rename = "ref")]
    reference: String,
    title: String,
    #[serde(default)]
    entries: Vec<TemplateFileExercise>,
}

#[derive(Debug, Deserialize)]
struct TemplateFileExercise {
    exercise: String,
    sets: Option<u32>,
    reps: Option<u32>,
    weight_kg: Option<f64>,
}

fn default_rest_secs() -> u32 {
    90
}

/// Resolver backed by a TOML template library file
pub struct TomlTemplateResolver {
    templates: HashMap<TemplateRef, WorkoutTemplate>,
    exercises: HashMap<TemplateRef, ExerciseDef>,
}

impl TomlTemplateResolver {
    /// Load the library file. A missing file yields an empty library so the
    /// service can start before any templates exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Template library not found at {}, starting empty", path.display());
            return Ok(Self {
                templates: HashMap::new(),
                exercises: HashMap::new(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let file: LibraryFile = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid template library: {e}")))?;

        let mut exercises = HashMap::new();
        for entry in file.exercises {
            let reference = TemplateRef::normalize(&entry.reference)?;
            exercises.insert(
                reference.clone(),
                ExerciseDef {
                    reference,
                    name: entry.name,
                    rest_secs: entry.rest_secs,
                },
            );
        }

        let mut templates = HashMap::new();
        for entry in file.templates {
            let reference = TemplateRef::normalize(&entry.reference)?;
            let entries = entry
                .entries
                .into_iter()
                .map(|e| {
                    Ok(TemplateEntry {
                        exercise_ref: TemplateRef::normalize(&e.exercise)?,
                        planned_sets: e.sets,
                        planned_reps: e.reps,
                        planned_weight_kg: e.weight_kg,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            templates.insert(
                reference.clone(),
                WorkoutTemplate {
                    reference,
                    title: entry.title,
                    entries,
                },
            );
        }

        info!(
            "Loaded template library: {} templates, {} exercises",
            templates.len(),
            exercises.len()
        );

        Ok(Self { templates, exercises })
    }
}

#[async_trait]
impl TemplateResolver for TomlTemplateResolver {
    async fn resolve(&self, reference: &TemplateRef) -> Result<ResolvedTemplate> {
        let started = std::time::Instant::now();

        let template = self
            .templates
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::TemplateNotFound(reference.to_string()))?;

        // All-or-nothing: every entry's exercise definition must resolve
        let exercise_defs = template
            .entries
            .iter()
            .map(|entry| {
                self.exercises
                    .get(&entry.exercise_ref)
                    .cloned()
                    .ok_or_else(|| {
                        Error::Resolution(format!(
                            "exercise definition missing: {}",
                            entry.exercise_ref
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedTemplate {
            template,
            exercise_defs,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn list_by_author(&self, author: &str) -> Result<Vec<TemplateSummary>> {
        Ok(self
            .templates
            .values()
            .filter(|t| t.reference.author == author)
            .map(|t| TemplateSummary {
                reference: t.reference.clone(),
                title: t.title.clone(),
            })
            .collect())
    }

    async fn resolve_exercise(&self, reference: &TemplateRef) -> Result<ExerciseDef> {
        self.exercises
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::Resolution(format!("exercise not found: {reference}")))
    }
}
