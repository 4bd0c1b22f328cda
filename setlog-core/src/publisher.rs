//! Record publication
//!
//! The event publisher is an external collaborator with at-least-once
//! semantics. A record queued while the transport is offline is reported as
//! accepted; retry and delivery discipline belong to the collaborator, not
//! the orchestrator.

use crate::error::{Error, Result};
use async_trait::async_trait;
use setlog_common::record::WorkoutRecord;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Publication outcome reported by the collaborator
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Record durably accepted (or queued for later delivery, which counts)
    Accepted { id: Option<String> },
    /// Record rejected; the orchestrator surfaces a dismissible error
    Rejected { error: String },
}

/// Event publisher collaborator contract
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, record: &WorkoutRecord) -> Result<PublishOutcome>;
}

/// Publisher backed by an append-only NDJSON outbox file.
///
/// Every record is queued locally and reported accepted; a separate delivery
/// process drains the outbox toward the event network.
pub struct OutboxPublisher {
    path: PathBuf,
}

impl OutboxPublisher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl EventPublisher for OutboxPublisher {
    async fn publish(&self, record: &WorkoutRecord) -> Result<PublishOutcome> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| Error::Publication(format!("record serialization failed: {e}")))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Publication(format!("outbox open failed: {e}")))?;
        file.write_all(&line)
            .await
            .map_err(|e| Error::Publication(format!("outbox append failed: {e}")))?;
        file.flush()
            .await
            .map_err(|e| Error::Publication(format!("outbox flush failed: {e}")))?;

        info!("Queued record {} to outbox", record.id);
        Ok(PublishOutcome::Accepted {
            id: Some(record.id.clone()),
        })
    }
}
