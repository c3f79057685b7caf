use super::status::{load_status, JobStatusView};
use crate::status_store::JobStatusStore;
use anyhow::Result;
use std::sync::Arc;

/// Read side of the job status records. Safe to poll at any rate.
#[derive(Clone)]
pub struct StatusReporter {
    status_store: Arc<dyn JobStatusStore>,
}

impl StatusReporter {
    pub fn new(status_store: Arc<dyn JobStatusStore>) -> Self {
        Self { status_store }
    }

    /// `Ok(None)` means the job is unknown or its record expired.
    pub fn get_status(&self, job_id: &str) -> Result<Option<JobStatusView>> {
        Ok(load_status(self.status_store.as_ref(), job_id)?.map(JobStatusView::from))
    }
}
