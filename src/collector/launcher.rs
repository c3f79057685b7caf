use super::context::CollectorContext;
use super::job::{JobRequest, LaunchError};
use super::metrics::CollectorMetrics;
use super::status::{load_status, save_status, JobState, JobStatus};
use crate::config::CollectorSettings;
use crate::status_store::JobStatusStore;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

/// Command sent to the executor.
pub enum ExecutorCommand {
    /// Run a job whose PENDING status has already been written.
    Run { status: JobStatus },
    /// Cancel a job. Answers whether the executor was still running it.
    Cancel {
        job_id: String,
        response: oneshot::Sender<bool>,
    },
    /// Answers whether the executor owns a live task for the job.
    IsActive {
        job_id: String,
        response: oneshot::Sender<bool>,
    },
}

/// Accepts job requests and hands them to the executor without waiting for them.
#[derive(Clone)]
pub struct JobLauncher {
    command_tx: mpsc::Sender<ExecutorCommand>,
    status_store: Arc<dyn JobStatusStore>,
    metrics: Arc<CollectorMetrics>,
    settings: CollectorSettings,
}

impl JobLauncher {
    pub fn new(command_tx: mpsc::Sender<ExecutorCommand>, ctx: &CollectorContext) -> Self {
        Self {
            command_tx,
            status_store: Arc::clone(&ctx.status_store),
            metrics: Arc::clone(&ctx.metrics),
            settings: ctx.settings.clone(),
        }
    }

    /// Validates `request`, writes its PENDING status and queues it.
    /// Returns the new job id. Invalid requests write nothing.
    pub async fn launch(&self, request: JobRequest) -> Result<String, LaunchError> {
        request.validate(self.settings.max_import_range)?;
        let job_id = Uuid::new_v4().to_string();
        self.submit(JobStatus::pending(&job_id, request)).await
    }

    /// Starts a new job continuing a FAILED one after its last checkpoint.
    ///
    /// A PENDING or RUNNING job that no task owns anymore (left over by a
    /// process that died) is first marked FAILED and then resumed.
    pub async fn resume(&self, job_id: &str) -> Result<String, LaunchError> {
        let mut previous = self.load(job_id)?;
        if !previous.state.is_terminal() {
            if self
                .ask(|response| ExecutorCommand::IsActive {
                    job_id: job_id.to_string(),
                    response,
                })
                .await?
            {
                return Err(LaunchError::NotResumable(previous.state));
            }

            // The job may have finished while the executor was answering
            previous = self.load(job_id)?;
            if !previous.state.is_terminal() {
                self.abandon(&mut previous, "Abandoned by a previous process")?;
            }
        }
        if previous.state == JobState::Completed {
            return Err(LaunchError::NotResumable(previous.state));
        }

        let new_id = Uuid::new_v4().to_string();
        let status = JobStatus::resumed(&new_id, &previous);
        info!(
            "Resuming job {} as {} after checkpoint {:?}",
            job_id, new_id, status.resume_after
        );
        self.submit(status).await
    }

    /// Asks for a job to stop. Returns `false` if it had already finished.
    pub async fn cancel(&self, job_id: &str) -> Result<bool, LaunchError> {
        if self.load(job_id)?.state.is_terminal() {
            return Ok(false);
        }

        let cancelled = self
            .ask(|response| ExecutorCommand::Cancel {
                job_id: job_id.to_string(),
                response,
            })
            .await?;
        if cancelled {
            info!("Cancellation requested for job {}", job_id);
            return Ok(true);
        }

        // Not owned by the executor: either it just finished, or it is orphaned
        match load_status(self.status_store.as_ref(), job_id)? {
            Some(mut current) if !current.state.is_terminal() => {
                self.abandon(&mut current, "Cancelled")?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn load(&self, job_id: &str) -> Result<JobStatus, LaunchError> {
        load_status(self.status_store.as_ref(), job_id)?.ok_or(LaunchError::NotFound)
    }

    fn abandon(&self, status: &mut JobStatus, message: &str) -> Result<(), LaunchError> {
        warn!("Marking orphaned job {} as failed", status.job_id);
        if status.fail(message).is_ok() {
            save_status(self.status_store.as_ref(), status, self.settings.status_ttl)?;
        }
        Ok(())
    }

    async fn ask<F>(&self, make_command: F) -> Result<bool, LaunchError>
    where
        F: FnOnce(oneshot::Sender<bool>) -> ExecutorCommand,
    {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(make_command(response_tx))
            .await
            .map_err(|_| LaunchError::ExecutorUnavailable)?;
        response_rx
            .await
            .map_err(|_| LaunchError::ExecutorUnavailable)
    }

    async fn submit(&self, status: JobStatus) -> Result<String, LaunchError> {
        save_status(self.status_store.as_ref(), &status, self.settings.status_ttl)?;
        let job_id = status.job_id.clone();
        let kind = status.kind;

        let command = ExecutorCommand::Run {
            status: status.clone(),
        };
        if self.command_tx.send(command).await.is_err() {
            // Do not leave a PENDING record nobody will ever pick up
            let mut status = status;
            if status.fail("Job executor is not running").is_ok() {
                save_status(self.status_store.as_ref(), &status, self.settings.status_ttl)?;
            }
            return Err(LaunchError::ExecutorUnavailable);
        }

        self.metrics.record_job_launched(kind);
        info!("Launched {} job {}", kind, job_id);
        Ok(job_id)
    }
}
