//! Active workout session
//!
//! The session shell aggregate, the progression cursor, and the execution
//! actor that owns them while a workout is in progress.

pub mod actor;
pub mod commands;
pub mod cursor;
pub mod rest;
pub mod shell;

pub use actor::{spawn, ActorHandle, ExerciseMeta, SeedDraft, SessionSeed};
pub use commands::{ActorCommand, ActorEvent, ExecutionPhase, SessionSnapshot, SetOverrides};
pub use cursor::ProgressionCursor;
pub use shell::{CompletedSet, ExerciseSlot, SessionShell};
