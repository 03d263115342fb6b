//! Pipeline run records: the persisted shape of one prompt's end-to-end
//! generation attempt. Mutated stage by stage, persisted after every
//! transition, immutable once terminal.

use crate::shapes::{HighLevelShape, LowLevelShape};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    Idle,
    Validating,
    HighLevel,
    LowLevel,
    Placing,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStatus {
    InProgress,
    /// Every requested shape was placed.
    Complete,
    /// At least one shape was placed, some permanently failed.
    Partial,
    Failed,
}

impl PipelineStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::InProgress)
    }
}

/// One entry in the pipeline's ordered error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    pub stage: PipelineStage,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Prompt validation outcome as returned by the external validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub raw_text: String,
}

/// Per-stage results, filled in as the pipeline advances. `low_level` is
/// index-aligned with `high_level`; a `None` slot is a shape that
/// exhausted its retries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageRecord {
    pub validation: Option<ValidationOutcome>,
    pub high_level: Option<Vec<HighLevelShape>>,
    pub low_level: Option<Vec<Option<LowLevelShape>>>,
    pub placed_ids: Option<Vec<String>>,
}

/// Summary counts recorded once the pipeline reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub requested: usize,
    pub placed: usize,
    pub failed_indices: Vec<usize>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPipeline {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
    pub stage: PipelineStage,
    pub status: PipelineStatus,
    pub stages: StageRecord,
    pub errors: Vec<StageError>,
    pub metadata: Option<PipelineMetadata>,
}

impl GenerationPipeline {
    pub fn new(id: Uuid, prompt: impl Into<String>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            prompt: prompt.into(),
            stage: PipelineStage::Idle,
            status: PipelineStatus::InProgress,
            stages: StageRecord::default(),
            errors: Vec::new(),
            metadata: None,
        }
    }

    pub fn record_error(&mut self, stage: PipelineStage, message: impl Into<String>) {
        self.errors.push(StageError {
            stage,
            message: message.into(),
            at: Utc::now(),
        });
    }

    /// The most recent error message, used as the user-facing summary for
    /// failed runs.
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(|e| e.message.as_str())
    }
}
