use super::context::CollectorContext;
use super::launcher::{ExecutorCommand, JobLauncher};
use super::reporter::StatusReporter;
use super::runner::JobRunner;
use super::status::{save_status, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// How often finished job handles are reaped when no command arrives.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

/// Longest wait for a single job to stop during shutdown.
const SHUTDOWN_JOB_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs launched jobs on their own tasks, at most `max_concurrent_jobs` at once.
pub struct JobExecutor {
    ctx: CollectorContext,

    /// Receiver for commands from the launcher
    command_receiver: mpsc::Receiver<ExecutorCommand>,

    /// Token to signal executor shutdown.
    shutdown_token: CancellationToken,

    /// One permit per job allowed to run at the same time.
    permits: Arc<Semaphore>,

    /// Tasks of jobs that are queued or running, by job id.
    running_handles: HashMap<String, JoinHandle<()>>,

    /// Cancellation tokens for each job in `running_handles`.
    job_cancel_tokens: HashMap<String, CancellationToken>,
}

/// Everything the HTTP layer needs to talk to the collector.
#[derive(Clone)]
pub struct CollectorHandle {
    pub launcher: JobLauncher,
    pub reporter: StatusReporter,
}

impl JobExecutor {
    pub fn new(
        ctx: CollectorContext,
        command_receiver: mpsc::Receiver<ExecutorCommand>,
        shutdown_token: CancellationToken,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(ctx.settings.max_concurrent_jobs.max(1)));
        Self {
            ctx,
            command_receiver,
            shutdown_token,
            permits,
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
        }
    }

    /// Main executor loop.
    pub async fn run(&mut self) {
        info!(
            "Starting job executor with {} slots",
            self.ctx.settings.max_concurrent_jobs
        );

        loop {
            self.cleanup_finished_jobs().await;

            tokio::select! {
                command = self.command_receiver.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("All collector handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                _ = tokio::time::sleep(CLEANUP_INTERVAL) => {}
                _ = self.shutdown_token.cancelled() => {
                    info!("Executor received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job executor stopped");
    }

    fn handle_command(&mut self, command: ExecutorCommand) {
        match command {
            ExecutorCommand::Run { status } => self.spawn_job(status),
            ExecutorCommand::Cancel { job_id, response } => {
                let _ = response.send(self.cancel_job(&job_id));
            }
            ExecutorCommand::IsActive { job_id, response } => {
                let _ = response.send(self.is_active(&job_id));
            }
        }
    }

    fn is_active(&self, job_id: &str) -> bool {
        self.running_handles
            .get(job_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    fn cancel_job(&self, job_id: &str) -> bool {
        if !self.is_active(job_id) {
            return false;
        }
        match self.job_cancel_tokens.get(job_id) {
            Some(token) => {
                debug!("Cancelling job: {}", job_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn spawn_job(&mut self, status: JobStatus) {
        let job_id = status.job_id.clone();
        let cancel_token = self.shutdown_token.child_token();
        self.job_cancel_tokens
            .insert(job_id.clone(), cancel_token.clone());

        let ctx = self.ctx.clone();
        let permits = Arc::clone(&self.permits);

        let handle = tokio::spawn(async move {
            // Jobs waiting for a slot stay PENDING
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
                _ = cancel_token.cancelled() => {
                    let mut status = status;
                    if status.fail("Cancelled").is_ok() {
                        if let Err(e) = save_status(
                            ctx.status_store.as_ref(),
                            &status,
                            ctx.settings.status_ttl,
                        ) {
                            error!("Failed to record cancellation of job {}: {:#}", status.job_id, e);
                        }
                    }
                    info!("Job {} cancelled before it started", status.job_id);
                    return;
                }
            };

            JobRunner::new(ctx).execute(status, &cancel_token).await;
        });

        self.running_handles.insert(job_id, handle);
    }

    /// Clean up handles for finished jobs.
    async fn cleanup_finished_jobs(&mut self) {
        let finished: Vec<String> = self
            .running_handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(job_id, _)| job_id.clone())
            .collect();

        for job_id in finished {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                if let Err(e) = handle.await {
                    error!("Job {} task panicked: {}", job_id, e);
                }
            }
            self.job_cancel_tokens.remove(&job_id);
        }
    }

    /// Cancels every job and waits for them to record their final status.
    async fn shutdown(&mut self) {
        info!("Shutting down executor...");

        for (job_id, token) in &self.job_cancel_tokens {
            debug!("Cancelling job: {}", job_id);
            token.cancel();
        }

        for (job_id, handle) in self.running_handles.drain() {
            if tokio::time::timeout(SHUTDOWN_JOB_TIMEOUT, handle)
                .await
                .is_err()
            {
                error!("Job {} did not stop within {:?}", job_id, SHUTDOWN_JOB_TIMEOUT);
            }
        }

        self.job_cancel_tokens.clear();
        info!("Executor shutdown complete");
    }
}

/// Create an executor and the handle used to launch jobs and read their status.
pub fn create_collector(
    ctx: CollectorContext,
    shutdown_token: CancellationToken,
) -> (JobExecutor, CollectorHandle) {
    let (command_tx, command_rx) = mpsc::channel(100);

    let handle = CollectorHandle {
        launcher: JobLauncher::new(command_tx, &ctx),
        reporter: StatusReporter::new(Arc::clone(&ctx.status_store)),
    };
    let executor = JobExecutor::new(ctx, command_rx, shutdown_token);

    (executor, handle)
}
