use super::job::{ItemOutcome, JobError, JobKind, JobRequest};
use crate::status_store::JobStatusStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const STATUS_KEY_PREFIX: &str = "collector:job:";

/// Key a job's status record lives under in the status store.
pub fn status_key(job_id: &str) -> String {
    format!("{}{}", STATUS_KEY_PREFIX, job_id)
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn save_status(store: &dyn JobStatusStore, status: &JobStatus, ttl: Duration) -> Result<()> {
    let value = serde_json::to_string(status).context("Failed to serialize job status")?;
    store
        .set(&status_key(&status.job_id), &value, ttl)
        .with_context(|| format!("Failed to write status of job {}", status.job_id))
}

/// Reads a job's status. A record that no longer deserializes is logged and
/// reported as absent, like an expired one.
pub fn load_status(store: &dyn JobStatusStore, job_id: &str) -> Result<Option<JobStatus>> {
    let raw = match store.get(&status_key(job_id))? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    match serde_json::from_str(&raw) {
        Ok(status) => Ok(Some(status)),
        Err(e) => {
            warn!("Ignoring unreadable status record of job {}: {}", job_id, e);
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Lifecycle is PENDING -> RUNNING -> COMPLETED | FAILED. A pending job
    /// may also fail directly (cancelled or never started).
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Failed)
        )
    }
}

/// Progress and checkpoint record of one job.
///
/// Only the runner executing the job mutates it, through the methods below,
/// which keep `processed_count == success_count + fail_count <= total_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub kind: JobKind,
    pub request: JobRequest,
    pub state: JobState,
    pub total_count: u64,
    pub processed_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub error_message: Option<String>,
    /// Id of the last processed item.
    pub last_checkpoint: Option<u32>,
    /// Job this one was resumed from, if any.
    #[serde(default)]
    pub resumed_from: Option<String>,
    /// Work-set ids up to and including this one are skipped.
    #[serde(default)]
    pub resume_after: Option<u32>,
}

impl JobStatus {
    pub fn pending(job_id: &str, request: JobRequest) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind: request.kind(),
            total_count: request.known_total(),
            request,
            state: JobState::Pending,
            processed_count: 0,
            success_count: 0,
            fail_count: 0,
            started_at: now_millis(),
            completed_at: None,
            error_message: None,
            last_checkpoint: None,
            resumed_from: None,
            resume_after: None,
        }
    }

    /// A new PENDING job continuing where `previous` stopped.
    pub fn resumed(job_id: &str, previous: &JobStatus) -> Self {
        let mut status = Self::pending(job_id, previous.request.clone());
        status.resumed_from = Some(previous.job_id.clone());
        // A predecessor that processed nothing passes its own cursor on
        status.resume_after = previous.last_checkpoint.or(previous.resume_after);
        if let (JobRequest::MetadataImport { start, end }, Some(cursor)) =
            (&status.request, status.resume_after)
        {
            let done_up_to = cursor.max(start.saturating_sub(1));
            status.total_count = u64::from(end.saturating_sub(done_up_to));
        }
        status
    }

    fn transition(&mut self, next: JobState) -> Result<(), JobError> {
        if !self.state.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn mark_running(&mut self, total_count: u64) -> Result<(), JobError> {
        self.transition(JobState::Running)?;
        self.total_count = total_count;
        self.started_at = now_millis();
        Ok(())
    }

    /// Folds one item outcome into the tally and moves the checkpoint to `problem_id`.
    pub fn record(&mut self, outcome: &ItemOutcome, problem_id: u32) -> Result<(), JobError> {
        if self.state != JobState::Running {
            return Err(JobError::NotRunning(self.state));
        }
        if self.processed_count >= self.total_count {
            return Err(JobError::CounterOverflow(self.total_count));
        }
        if outcome.is_success() {
            self.success_count += 1;
        } else {
            self.fail_count += 1;
        }
        self.processed_count += 1;
        self.last_checkpoint = Some(problem_id);
        Ok(())
    }

    /// Marks the job COMPLETED. A job with failed items still completes, with
    /// a partial failure summary in `error_message`.
    pub fn complete(&mut self) -> Result<(), JobError> {
        self.transition(JobState::Completed)?;
        self.completed_at = Some(now_millis());
        if self.fail_count > 0 {
            self.error_message = Some(format!(
                "{} of {} items failed",
                self.fail_count, self.processed_count
            ));
        }
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobState::Failed)?;
        self.completed_at = Some(now_millis());
        self.error_message = Some(message.into());
        Ok(())
    }

    pub fn counters_consistent(&self) -> bool {
        self.processed_count == self.success_count + self.fail_count
            && (self.state == JobState::Pending || self.processed_count <= self.total_count)
    }
}

/// Read-side view of a status, with the derived fields computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    #[serde(flatten)]
    pub status: JobStatus,
    pub progress_percentage: u64,
    pub estimated_remaining_seconds: Option<u64>,
}

impl From<JobStatus> for JobStatusView {
    fn from(status: JobStatus) -> Self {
        let progress_percentage = if status.total_count > 0 {
            (status.processed_count.saturating_mul(100) / status.total_count).min(100)
        } else {
            0
        };

        let estimated_remaining_seconds =
            if status.state == JobState::Running && status.processed_count > 0 {
                let remaining = status.total_count.saturating_sub(status.processed_count);
                Some((remaining as f64 * status.kind.avg_seconds_per_item()).ceil() as u64)
            } else {
                None
            };

        Self {
            status,
            progress_percentage,
            estimated_remaining_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_store::InMemoryJobStatusStore;

    fn running(total: u64) -> JobStatus {
        let mut status = JobStatus::pending("job-1", JobRequest::Reclassification);
        status.mark_running(total).unwrap();
        status
    }

    #[test]
    fn test_pending_status_for_import_knows_total() {
        let status = JobStatus::pending(
            "job-1",
            JobRequest::MetadataImport {
                start: 1000,
                end: 1002,
            },
        );
        assert_eq!(status.state, JobState::Pending);
        assert_eq!(status.kind, JobKind::MetadataImport);
        assert_eq!(status.total_count, 3);
        assert_eq!(status.processed_count, 0);
        assert!(status.completed_at.is_none());
        assert!(status.last_checkpoint.is_none());
    }

    #[test]
    fn test_state_only_moves_forward() {
        use JobState::*;
        let all = [Pending, Running, Completed, Failed];
        for from in all {
            for to in all {
                let expected = matches!(
                    (from, to),
                    (Pending, Running) | (Pending, Failed) | (Running, Completed) | (Running, Failed)
                );
                assert_eq!(from.can_transition_to(to), expected, "{:?} -> {:?}", from, to);
            }
        }
    }

    #[test]
    fn test_terminal_status_rejects_mutation() {
        let mut status = running(2);
        status.record(&ItemOutcome::Success, 1).unwrap();
        status.complete().unwrap();
        let completed_at = status.completed_at;

        assert!(matches!(
            status.record(&ItemOutcome::Success, 2),
            Err(JobError::NotRunning(JobState::Completed))
        ));
        assert!(status.fail("late").is_err());
        assert!(status.complete().is_err());
        assert!(status.mark_running(5).is_err());
        assert_eq!(status.completed_at, completed_at);
        assert_eq!(status.processed_count, 1);
    }

    #[test]
    fn test_record_keeps_counters_consistent() {
        let mut status = running(4);
        let outcomes = [
            ItemOutcome::Success,
            ItemOutcome::SkippedNotFound,
            ItemOutcome::Failed("boom".to_string()),
            ItemOutcome::Success,
        ];
        for (i, outcome) in outcomes.iter().enumerate() {
            status.record(outcome, 10 + i as u32).unwrap();
            assert!(status.counters_consistent());
        }
        assert_eq!(status.success_count, 2);
        assert_eq!(status.fail_count, 2);
        assert_eq!(status.last_checkpoint, Some(13));

        assert_eq!(
            status.record(&ItemOutcome::Success, 99),
            Err(JobError::CounterOverflow(4))
        );
        assert!(status.counters_consistent());
    }

    #[test]
    fn test_complete_with_failures_carries_summary() {
        let mut status = running(3);
        status.record(&ItemOutcome::Success, 1).unwrap();
        status.record(&ItemOutcome::SkippedNotFound, 2).unwrap();
        status.record(&ItemOutcome::Success, 3).unwrap();
        status.complete().unwrap();

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.error_message.as_deref(), Some("1 of 3 items failed"));
        assert!(status.completed_at.is_some());
    }

    #[test]
    fn test_pending_job_can_fail() {
        let mut status = JobStatus::pending("job-1", JobRequest::Reclassification);
        status.fail("Cancelled").unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error_message.as_deref(), Some("Cancelled"));
    }

    #[test]
    fn test_view_progress_and_eta() {
        let mut status = running(10);
        let view = JobStatusView::from(status.clone());
        assert_eq!(view.progress_percentage, 0);
        assert!(view.estimated_remaining_seconds.is_none());

        for id in 1..=3 {
            status.record(&ItemOutcome::Success, id).unwrap();
        }
        let view = JobStatusView::from(status.clone());
        assert_eq!(view.progress_percentage, 30);
        // 7 remaining * 3.0s
        assert_eq!(view.estimated_remaining_seconds, Some(21));

        status.complete().unwrap();
        let view = JobStatusView::from(status);
        assert!(view.estimated_remaining_seconds.is_none());
    }

    #[test]
    fn test_view_eta_rounds_up() {
        let mut status = JobStatus::pending(
            "job-2",
            JobRequest::MetadataImport { start: 1, end: 4 },
        );
        status.mark_running(4).unwrap();
        status.record(&ItemOutcome::Success, 1).unwrap();
        // 3 remaining * 0.5s = 1.5s
        assert_eq!(
            JobStatusView::from(status).estimated_remaining_seconds,
            Some(2)
        );
    }

    #[test]
    fn test_view_zero_total_has_zero_progress() {
        let mut status = running(0);
        status.complete().unwrap();
        assert_eq!(JobStatusView::from(status).progress_percentage, 0);
    }

    #[test]
    fn test_view_serializes_flat() {
        let view = JobStatusView::from(running(2));
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["job_id"], "job-1");
        assert_eq!(value["state"], "running");
        assert_eq!(value["progress_percentage"], 0);
        assert_eq!(value["request"]["type"], "reclassification");
    }

    #[test]
    fn test_resumed_status_continues_after_checkpoint() {
        let mut previous =
            JobStatus::pending("old", JobRequest::MetadataImport { start: 1, end: 10 });
        previous.mark_running(10).unwrap();
        for id in 1..=4 {
            previous.record(&ItemOutcome::Success, id).unwrap();
        }
        previous.fail("status store unreachable").unwrap();

        let resumed = JobStatus::resumed("new", &previous);
        assert_eq!(resumed.state, JobState::Pending);
        assert_eq!(resumed.resumed_from.as_deref(), Some("old"));
        assert_eq!(resumed.resume_after, Some(4));
        assert_eq!(resumed.total_count, 6);
        assert!(resumed.last_checkpoint.is_none());
        assert_eq!(resumed.processed_count, 0);
    }

    #[test]
    fn test_resumed_status_inherits_cursor_of_idle_predecessor() {
        let mut first = JobStatus::pending("a", JobRequest::Reclassification);
        first.resume_after = Some(42);
        first.fail("Cancelled").unwrap();

        let second = JobStatus::resumed("b", &first);
        assert_eq!(second.resume_after, Some(42));
        assert_eq!(second.total_count, 0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let store = InMemoryJobStatusStore::new();
        let status = running(3);
        save_status(&store, &status, Duration::from_secs(60)).unwrap();
        assert_eq!(load_status(&store, "job-1").unwrap(), Some(status));
        assert!(load_status(&store, "other").unwrap().is_none());
    }

    #[test]
    fn test_load_treats_corrupt_record_as_absent() {
        let store = InMemoryJobStatusStore::new();
        store
            .set(&status_key("bad"), "{not json", Duration::from_secs(60))
            .unwrap();
        assert!(load_status(&store, "bad").unwrap().is_none());
    }

    #[test]
    fn test_status_key() {
        assert_eq!(status_key("abc"), "collector:job:abc");
    }
}
