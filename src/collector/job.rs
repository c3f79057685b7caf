use super::context::CollectorContext;
use super::status::JobState;
use crate::sources::FetchError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The three collection job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    MetadataImport,
    DetailBackfill,
    Reclassification,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::MetadataImport => "metadata_import",
            JobKind::DetailBackfill => "detail_backfill",
            JobKind::Reclassification => "reclassification",
        }
    }

    /// Seconds one item is expected to take, used for the ETA. Derived from
    /// the pacing policy of the kind rather than measured.
    pub fn avg_seconds_per_item(&self) -> f64 {
        match self {
            JobKind::MetadataImport => 0.5,
            JobKind::DetailBackfill | JobKind::Reclassification => 3.0,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Launch parameters of a job. Stored in the status record so that a failed
/// job can be relaunched with the same parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobRequest {
    MetadataImport { start: u32, end: u32 },
    DetailBackfill { limit: Option<usize> },
    Reclassification,
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::MetadataImport { .. } => JobKind::MetadataImport,
            JobRequest::DetailBackfill { .. } => JobKind::DetailBackfill,
            JobRequest::Reclassification => JobKind::Reclassification,
        }
    }

    pub fn validate(&self, max_import_range: u32) -> Result<(), LaunchError> {
        match *self {
            JobRequest::MetadataImport { start, end } => {
                if start == 0 || end == 0 {
                    return Err(LaunchError::InvalidRequest(
                        "start and end must be positive".to_string(),
                    ));
                }
                if start > end {
                    return Err(LaunchError::InvalidRequest(format!(
                        "start ({}) must not be greater than end ({})",
                        start, end
                    )));
                }
                let size = end - start + 1;
                if size > max_import_range {
                    return Err(LaunchError::InvalidRequest(format!(
                        "range of {} ids exceeds the maximum of {}",
                        size, max_import_range
                    )));
                }
            }
            JobRequest::DetailBackfill { limit: Some(0) } => {
                return Err(LaunchError::InvalidRequest(
                    "limit must be positive".to_string(),
                ));
            }
            JobRequest::DetailBackfill { .. } | JobRequest::Reclassification => {}
        }
        Ok(())
    }

    /// Work-set size when it is known without touching any store.
    pub fn known_total(&self) -> u64 {
        match *self {
            JobRequest::MetadataImport { start, end } if start <= end => {
                u64::from(end - start) + 1
            }
            _ => 0,
        }
    }
}

/// Result of processing a single work item. Only ever folded into the tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    SkippedNotFound,
    Failed(String),
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Success => "success",
            ItemOutcome::SkippedNotFound => "not_found",
            ItemOutcome::Failed(_) => "failed",
        }
    }
}

/// Errors that abort a whole job, or reject a status mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: JobState, to: JobState },
    #[error("cannot record an item while job is {0:?}")]
    NotRunning(JobState),
    #[error("processed count would exceed total count {0}")]
    CounterOverflow(u64),
    #[error("failed to resolve work set: {0}")]
    WorkSet(String),
    #[error("failed to persist job status: {0}")]
    StatusWrite(String),
    #[error("Cancelled")]
    Cancelled,
}

/// Errors returned synchronously to whoever launches, resumes or cancels a job.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("job not found")]
    NotFound,
    #[error("job is {0:?} and cannot be resumed")]
    NotResumable(JobState),
    #[error("job executor is not running")]
    ExecutorUnavailable,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// One collection job kind, as seen by the generic runner.
///
/// The runner owns the loop, the tally, pacing and checkpointing; a job only
/// says what to iterate over, how to fetch one item and where to put it.
#[async_trait]
pub trait CollectionJob: Send + Sync {
    type Payload: Send;

    fn kind(&self) -> JobKind;

    /// Ordered work set, by ascending problem id, holding only ids greater
    /// than `after` when a resumed job continues past a checkpoint.
    async fn resolve_work_set(
        &self,
        ctx: &CollectorContext,
        after: Option<u32>,
    ) -> Result<Vec<u32>>;

    async fn fetch_item(
        &self,
        ctx: &CollectorContext,
        problem_id: u32,
    ) -> Result<Self::Payload, FetchError>;

    /// Maps the fetched payload onto the stored problem and upserts it.
    async fn map_and_persist(&self, ctx: &CollectorContext, payload: Self::Payload) -> Result<()>;
}
