//! Template reference parsing and normalization
//!
//! A canonical template reference has exactly three colon-delimited parts:
//! `kind:author:discriminator`. An upstream defect can duplicate the first
//! two parts, producing a five-part form (`kind:author:kind:author:disc`);
//! normalization recognizes and collapses that pattern. Anything else is
//! repaired best-effort from the first two and last parts, or rejected.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Canonical 3-part template reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateRef {
    /// Record kind discriminator (numeric by convention, opaque here)
    pub kind: String,
    /// Author identity (public key or handle)
    pub author: String,
    /// Per-author unique discriminator
    pub discriminator: String,
}

impl TemplateRef {
    /// Build a reference from already-validated parts
    pub fn new(
        kind: impl Into<String>,
        author: impl Into<String>,
        discriminator: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            author: author.into(),
            discriminator: discriminator.into(),
        }
    }

    /// Parse and normalize a raw reference string.
    ///
    /// Accepted forms:
    /// - 3 non-empty parts: returned as-is
    /// - 5 parts where parts 0..2 repeat parts 2..4: the known upstream
    ///   duplication defect, collapsed to `{0}:{1}:{4}`
    /// - any other multi-part shape: best-effort reconstruction from the
    ///   first two and last parts, logged as an anomaly
    ///
    /// Normalization is idempotent: a well-formed reference round-trips
    /// unchanged.
    pub fn normalize(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();

        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidReference(format!(
                "empty segment in reference: {raw:?}"
            )));
        }

        match parts.len() {
            3 => Ok(Self::new(parts[0], parts[1], parts[2])),
            5 if parts[0] == parts[2] && parts[1] == parts[3] => {
                warn!("Collapsing duplicated template reference: {}", raw);
                Ok(Self::new(parts[0], parts[1], parts[4]))
            }
            n if n > 3 => {
                // Unknown corruption - reconstruct from the outer parts
                warn!(
                    "Unrecognized {}-part template reference {:?}, reconstructing",
                    n, raw
                );
                Ok(Self::new(parts[0], parts[1], parts[n - 1]))
            }
            _ => Err(Error::InvalidReference(format!(
                "expected 3 parts, got {}: {raw:?}",
                parts.len()
            ))),
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.author, self.discriminator)
    }
}

impl TryFrom<String> for TemplateRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::normalize(&value)
    }
}

impl From<TemplateRef> for String {
    fn from(value: TemplateRef) -> Self {
        value.to_string()
    }
}
