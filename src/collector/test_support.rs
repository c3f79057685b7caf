//! Fakes shared by the collector unit tests.

use super::context::CollectorContext;
use super::metrics::CollectorMetrics;
use super::pacing::PacingController;
use crate::config::CollectorSettings;
use crate::problem_store::{Problem, ProblemCategory, SqliteProblemStore};
use crate::sources::{
    DetailSource, FetchError, MetadataSource, ProblemDetail, ProblemMetadata,
};
use crate::status_store::{InMemoryJobStatusStore, JobStatusStore};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn metadata(problem_id: u32, tags: &[&str]) -> ProblemMetadata {
    ProblemMetadata {
        problem_id,
        title: format!("Problem {}", problem_id),
        level: 3,
        accepted_user_count: 100,
        average_tries: 1.5,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn detail(problem_id: u32, tags: &[&str]) -> ProblemDetail {
    ProblemDetail {
        problem_id,
        description: format!("Statement of {}", problem_id),
        input_description: "input".to_string(),
        output_description: "output".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn stored_problem(problem_id: u32) -> Problem {
    Problem {
        problem_id,
        title: format!("Stored {}", problem_id),
        level: 1,
        accepted_user_count: 10,
        average_tries: 2.0,
        tags: vec![],
        category: ProblemCategory::Other,
        description: None,
        input_description: None,
        output_description: None,
        updated_at: 0,
    }
}

/// Metadata source answering from a fixed table. Unknown ids are NotFound.
#[derive(Default)]
pub struct FakeMetadataSource {
    responses: HashMap<u32, Result<ProblemMetadata, FetchError>>,
    calls: Mutex<Vec<u32>>,
}

impl FakeMetadataSource {
    pub fn with_problem(mut self, problem_id: u32, tags: &[&str]) -> Self {
        self.responses
            .insert(problem_id, Ok(metadata(problem_id, tags)));
        self
    }

    pub fn with_error(mut self, problem_id: u32, error: FetchError) -> Self {
        self.responses.insert(problem_id, Err(error));
        self
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataSource for FakeMetadataSource {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemMetadata, FetchError> {
        self.calls.lock().unwrap().push(problem_id);
        self.responses
            .get(&problem_id)
            .cloned()
            .unwrap_or(Err(FetchError::NotFound))
    }
}

#[derive(Default)]
pub struct FakeDetailSource {
    responses: HashMap<u32, Result<ProblemDetail, FetchError>>,
    calls: Mutex<Vec<u32>>,
}

impl FakeDetailSource {
    pub fn with_detail(mut self, problem_id: u32, tags: &[&str]) -> Self {
        self.responses.insert(problem_id, Ok(detail(problem_id, tags)));
        self
    }

    pub fn with_error(mut self, problem_id: u32, error: FetchError) -> Self {
        self.responses.insert(problem_id, Err(error));
        self
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetailSource for FakeDetailSource {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemDetail, FetchError> {
        self.calls.lock().unwrap().push(problem_id);
        self.responses
            .get(&problem_id)
            .cloned()
            .unwrap_or(Err(FetchError::NotFound))
    }
}

/// In-memory status store that counts writes and starts failing after a
/// given number of them.
#[derive(Default)]
pub struct FlakyStatusStore {
    inner: InMemoryJobStatusStore,
    writes: AtomicUsize,
    fail_after: Option<usize>,
}

impl FlakyStatusStore {
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Default::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl JobStatusStore for FlakyStatusStore {
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let previous = self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| previous >= limit) {
            bail!("status store unreachable");
        }
        self.inner.set(key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn purge_expired(&self) -> Result<usize> {
        self.inner.purge_expired()
    }
}

pub struct TestContext {
    pub ctx: CollectorContext,
    pub problem_store: Arc<SqliteProblemStore>,
    pub metadata: Arc<FakeMetadataSource>,
    pub detail: Arc<FakeDetailSource>,
    _temp_dir: TempDir,
}

pub fn test_context(metadata: FakeMetadataSource, detail: FakeDetailSource) -> TestContext {
    test_context_with_status_store(metadata, detail, Arc::new(InMemoryJobStatusStore::new()))
}

pub fn test_context_with_status_store(
    metadata: FakeMetadataSource,
    detail: FakeDetailSource,
    status_store: Arc<dyn JobStatusStore>,
) -> TestContext {
    let temp_dir = TempDir::new().unwrap();
    let problem_store = Arc::new(SqliteProblemStore::new(temp_dir.path().join("problems.db")).unwrap());
    let metadata = Arc::new(metadata);
    let detail = Arc::new(detail);

    let ctx = CollectorContext::new(
        status_store,
        problem_store.clone(),
        metadata.clone(),
        detail.clone(),
        Arc::new(CollectorMetrics::new().unwrap()),
        CollectorSettings::default(),
    )
    .with_pacing(PacingController::disabled());

    TestContext {
        ctx,
        problem_store,
        metadata,
        detail,
        _temp_dir: temp_dir,
    }
}
