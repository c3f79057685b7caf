use super::context::CollectorContext;
use super::job::{CollectionJob, ItemOutcome, JobError, JobKind, JobRequest};
use super::jobs::{DetailBackfillJob, MetadataImportJob, ReclassificationJob};
use super::status::{save_status, JobStatus};
use crate::sources::FetchError;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives one job through its work set.
///
/// The runner is the only writer of the job's status record. Single item
/// failures are counted and skipped; only a work-set resolution failure, a
/// status write failure or a cancellation ends the job as FAILED.
pub struct JobRunner {
    ctx: CollectorContext,
}

impl JobRunner {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }

    /// Runs the job described by `status.request` and returns its final status.
    pub async fn execute(&self, status: JobStatus, cancel: &CancellationToken) -> JobStatus {
        match status.request.clone() {
            JobRequest::MetadataImport { start, end } => {
                self.run(&MetadataImportJob { start, end }, status, cancel)
                    .await
            }
            JobRequest::DetailBackfill { limit } => {
                self.run(&DetailBackfillJob { limit }, status, cancel).await
            }
            JobRequest::Reclassification => self.run(&ReclassificationJob, status, cancel).await,
        }
    }

    pub async fn run<J: CollectionJob>(
        &self,
        job: &J,
        mut status: JobStatus,
        cancel: &CancellationToken,
    ) -> JobStatus {
        let kind = job.kind();
        let start_time = Instant::now();
        self.ctx.metrics.record_job_started(kind);
        info!("Starting {} job {}", kind, status.job_id);

        let result = self.drive(job, &mut status, cancel).await;
        let elapsed = start_time.elapsed();

        let label = match result {
            Ok(()) => {
                info!(
                    "Job {} completed in {:?}: {} processed, {} succeeded, {} failed",
                    status.job_id,
                    elapsed,
                    status.processed_count,
                    status.success_count,
                    status.fail_count
                );
                "completed"
            }
            Err(e) => {
                let label = if e == JobError::Cancelled {
                    info!(
                        "Job {} cancelled after {} items",
                        status.job_id, status.processed_count
                    );
                    "cancelled"
                } else {
                    error!("Job {} failed after {:?}: {}", status.job_id, elapsed, e);
                    "failed"
                };
                self.record_failure(&mut status, &e);
                label
            }
        };

        self.ctx.metrics.record_job_finished(kind, label, elapsed);
        status
    }

    async fn drive<J: CollectionJob>(
        &self,
        job: &J,
        status: &mut JobStatus,
        cancel: &CancellationToken,
    ) -> Result<(), JobError> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let work_set = job
            .resolve_work_set(&self.ctx, status.resume_after)
            .await
            .map_err(|e| JobError::WorkSet(format!("{:#}", e)))?;
        if let Some(cursor) = status.resume_after {
            info!(
                "Job {} resuming after {}, {} items left",
                status.job_id,
                cursor,
                work_set.len()
            );
        }

        status.mark_running(work_set.len() as u64)?;
        self.persist(status)?;

        let kind = job.kind();
        let checkpoint_interval = self.checkpoint_interval(kind);
        let last_index = work_set.len().saturating_sub(1);

        for (index, problem_id) in work_set.into_iter().enumerate() {
            let outcome = self.process_item(job, problem_id).await;
            self.ctx.metrics.record_item(kind, &outcome);
            status.record(&outcome, problem_id)?;

            if index == last_index {
                break;
            }
            if status.processed_count % checkpoint_interval == 0 {
                self.persist(status)?;
            }
            if !self.ctx.pacing.wait(kind, cancel).await {
                return Err(JobError::Cancelled);
            }
        }

        status.complete()?;
        self.persist(status)
    }

    async fn process_item<J: CollectionJob>(&self, job: &J, problem_id: u32) -> ItemOutcome {
        let payload = match job.fetch_item(&self.ctx, problem_id).await {
            Ok(payload) => payload,
            Err(FetchError::NotFound) => {
                debug!("Problem {} not found, skipping", problem_id);
                return ItemOutcome::SkippedNotFound;
            }
            Err(e) => {
                warn!("Failed to fetch problem {}: {}", problem_id, e);
                return ItemOutcome::Failed(e.to_string());
            }
        };

        match job.map_and_persist(&self.ctx, payload).await {
            Ok(()) => {
                debug!("Stored problem {}", problem_id);
                ItemOutcome::Success
            }
            Err(e) => {
                warn!("Failed to store problem {}: {:#}", problem_id, e);
                ItemOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    fn checkpoint_interval(&self, kind: JobKind) -> u64 {
        let interval = match kind {
            JobKind::MetadataImport => self.ctx.settings.import_checkpoint_interval,
            JobKind::DetailBackfill | JobKind::Reclassification => {
                self.ctx.settings.crawl_checkpoint_interval
            }
        };
        interval.max(1)
    }

    fn persist(&self, status: &JobStatus) -> Result<(), JobError> {
        save_status(
            self.ctx.status_store.as_ref(),
            status,
            self.ctx.settings.status_ttl,
        )
        .map_err(|e| JobError::StatusWrite(format!("{:#}", e)))
    }

    fn record_failure(&self, status: &mut JobStatus, error: &JobError) {
        if let Err(e) = status.fail(error.to_string()) {
            // Completed in memory but the final write failed; nothing left to move
            error!("Cannot mark job {} as failed: {}", status.job_id, e);
            return;
        }
        if let Err(e) = self.persist(status) {
            error!("Failed to persist failure of job {}: {}", status.job_id, e);
        }
    }
}
