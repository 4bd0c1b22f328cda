//! # Setlog Common Library
//!
//! Shared code for the setlog workout orchestration service including:
//! - Event types (SessionEvent enum)
//! - Canonical workout record wire shape
//! - Template reference parsing and normalization
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod record;
pub mod template_ref;

pub use error::{Error, Result};
pub use template_ref::TemplateRef;
