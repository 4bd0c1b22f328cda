//! Workout session orchestration service
//!
//! Drives the lifecycle of a workout session from template selection
//! through active execution to publication of the signed workout record.

pub mod api;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod publish;
pub mod publisher;
pub mod resolver;
pub mod session;
pub mod setup;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::WorkoutOrchestrator;
