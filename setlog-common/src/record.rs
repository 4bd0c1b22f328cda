//! Canonical workout record wire shape
//!
//! The storage layer deduplicates records by content address, so two
//! structurally identical records silently collapse into one. Every set tag
//! therefore carries its per-slot ordinal, which makes repeated sets of the
//! same weight/reps distinct on the wire.

use crate::template_ref::TemplateRef;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Record kind for a completed workout session
pub const WORKOUT_RECORD_KIND: u32 = 1301;

/// Set classification carried in each set tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetType {
    /// Preparatory set, lighter than working weight
    WarmUp,
    /// Standard working set
    Normal,
    /// Reduced-weight continuation set
    Drop,
    /// Set taken to muscular failure
    Failure,
}

impl fmt::Display for SetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetType::WarmUp => write!(f, "warmup"),
            SetType::Normal => write!(f, "normal"),
            SetType::Drop => write!(f, "drop"),
            SetType::Failure => write!(f, "failure"),
        }
    }
}

impl std::str::FromStr for SetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "warmup" => Ok(SetType::WarmUp),
            "normal" => Ok(SetType::Normal),
            "drop" => Ok(SetType::Drop),
            "failure" => Ok(SetType::Failure),
            other => Err(format!("unknown set type: {other}")),
        }
    }
}

/// A published workout record
///
/// Tags follow the convention `[name, field, field, ...]`. A `set` tag
/// carries, in order: exercise reference, per-slot ordinal, weight, reps,
/// perceived-effort score, set type. A single `template` tag carries the
/// normalized back-reference to the source template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Content-addressed record id (hex sha256 of the canonical form)
    pub id: String,
    /// Record kind
    pub kind: u32,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Ordered tag list
    pub tags: Vec<Vec<String>>,
    /// Free-text content (session title)
    pub content: String,
}

impl WorkoutRecord {
    /// Assemble a record and compute its content address
    pub fn new(created_at: i64, tags: Vec<Vec<String>>, content: String) -> Self {
        let id = content_id(WORKOUT_RECORD_KIND, created_at, &tags, &content);
        Self {
            id,
            kind: WORKOUT_RECORD_KIND,
            created_at,
            tags,
            content,
        }
    }

    /// Tags whose name matches `name`
    pub fn tags_named(&self, name: &str) -> impl Iterator<Item = &Vec<String>> {
        let name = name.to_string();
        self.tags.iter().filter(move |t| t.first() == Some(&name))
    }
}

/// Build the set tag for one completed set.
///
/// Field order is part of the wire contract and must not change.
pub fn set_tag(
    exercise_ref: &str,
    set_number: u32,
    weight_kg: f64,
    reps: u32,
    rpe: Option<f32>,
    set_type: SetType,
) -> Vec<String> {
    vec![
        "set".to_string(),
        exercise_ref.to_string(),
        set_number.to_string(),
        format_weight(weight_kg),
        reps.to_string(),
        rpe.map(|r| r.to_string()).unwrap_or_default(),
        set_type.to_string(),
    ]
}

/// Build the template back-reference tag
pub fn template_tag(template_ref: &TemplateRef) -> Vec<String> {
    vec!["template".to_string(), template_ref.to_string()]
}

/// Weight serialization: bodyweight (0.0) serializes as "0", otherwise
/// the shortest decimal form
fn format_weight(weight_kg: f64) -> String {
    if weight_kg == weight_kg.trunc() {
        format!("{}", weight_kg as i64)
    } else {
        format!("{weight_kg}")
    }
}

/// Hex sha256 of the canonical `[kind, created_at, tags, content]` array
fn content_id(kind: u32, created_at: i64, tags: &[Vec<String>], content: &str) -> String {
    let canonical = serde_json::json!([kind, created_at, tags, content]);
    // Canonical form is compact JSON; serialization of this shape cannot fail
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
