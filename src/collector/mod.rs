//! Background collection jobs.
//!
//! A launched job gets a PENDING status record and is queued on the
//! [`JobExecutor`], which runs it on its own task once a slot is free. The
//! [`JobRunner`] then walks the job's work set one item at a time, pacing
//! external calls and checkpointing progress into the status store, where
//! the [`StatusReporter`] reads it back.

mod context;
mod executor;
mod job;
mod jobs;
mod launcher;
mod metrics;
mod pacing;
mod reporter;
mod runner;
mod status;

#[cfg(test)]
mod test_support;

pub use context::CollectorContext;
pub use executor::{create_collector, CollectorHandle, JobExecutor};
pub use job::{CollectionJob, ItemOutcome, JobError, JobKind, JobRequest, LaunchError};
pub use jobs::{classify, DetailBackfillJob, MetadataImportJob, ReclassificationJob};
pub use launcher::{ExecutorCommand, JobLauncher};
pub use metrics::CollectorMetrics;
pub use pacing::{PacingController, PacingPolicy};
pub use reporter::StatusReporter;
pub use runner::JobRunner;
pub use status::{status_key, JobState, JobStatus, JobStatusView};
