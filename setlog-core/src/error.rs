//! Error types for setlog-core
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. The taxonomy follows the recovery semantics: validation and
//! reference errors are fatal, resolution errors are retryable, publication
//! errors are recoverable (the workout is already complete locally).

use thiserror::Error;

/// Enumerated seed validation faults, raised before any actor state is
/// entered. These are reported as a set, not one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFault {
    MissingUserIdentity,
    MissingSessionShell,
    MissingTemplateSelection,
    MissingResolvedTemplate,
    MissingExerciseDefs,
}

impl std::fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValidationFault::MissingUserIdentity => "missing user identity",
            ValidationFault::MissingSessionShell => "missing session shell",
            ValidationFault::MissingTemplateSelection => "missing template selection",
            ValidationFault::MissingResolvedTemplate => "missing resolved template",
            ValidationFault::MissingExerciseDefs => "missing resolved exercise definitions",
        };
        write!(f, "{name}")
    }
}

/// Main error type for setlog-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Seed validation failed before actor startup (fatal)
    #[error("Validation failed: {}", format_faults(.0))]
    Validation(Vec<ValidationFault>),

    /// Template reference corrupt beyond repair (fatal)
    #[error("Invalid reference: {0}")]
    Reference(String),

    /// Template or exercise resolution failed (retryable)
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Resolution target does not exist (retryable)
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Record publication failed (recoverable, workout data preserved)
    #[error("Publication error: {0}")]
    Publication(String),

    /// Operation arrived in a state that does not accept it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Session actor errors
    #[error("Session error: {0}")]
    Session(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may usefully retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Resolution(_) | Error::TemplateNotFound(_))
    }
}

impl From<setlog_common::Error> for Error {
    fn from(e: setlog_common::Error) -> Self {
        match e {
            setlog_common::Error::InvalidReference(msg) => Error::Reference(msg),
            setlog_common::Error::NotFound(msg) => Error::NotFound(msg),
            setlog_common::Error::Config(msg) => Error::Config(msg),
            setlog_common::Error::Io(e) => Error::Io(e),
            other => Error::Internal(other.to_string()),
        }
    }
}

fn format_faults(faults: &[ValidationFault]) -> String {
    faults
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience Result type using setlog-core Error
pub type Result<T> = std::result::Result<T, Error>;
