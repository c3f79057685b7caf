use super::classify;
use crate::collector::context::CollectorContext;
use crate::collector::job::{CollectionJob, JobKind};
use crate::collector::status::now_millis;
use crate::problem_store::ProblemFilter;
use crate::sources::{FetchError, ProblemDetail};
use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Re-crawls the tag list of every stored problem and recomputes its category.
pub struct ReclassificationJob;

#[async_trait]
impl CollectionJob for ReclassificationJob {
    type Payload = ProblemDetail;

    fn kind(&self) -> JobKind {
        JobKind::Reclassification
    }

    async fn resolve_work_set(
        &self,
        ctx: &CollectorContext,
        after: Option<u32>,
    ) -> Result<Vec<u32>> {
        let problems = ctx
            .problem_store
            .find_matching(ProblemFilter::All, after, None)?;
        Ok(problems.into_iter().map(|p| p.problem_id).collect())
    }

    async fn fetch_item(
        &self,
        ctx: &CollectorContext,
        problem_id: u32,
    ) -> Result<ProblemDetail, FetchError> {
        ctx.detail_source.fetch(problem_id).await
    }

    async fn map_and_persist(&self, ctx: &CollectorContext, detail: ProblemDetail) -> Result<()> {
        let mut problem = ctx
            .problem_store
            .get(detail.problem_id)?
            .ok_or_else(|| anyhow!("problem {} is no longer stored", detail.problem_id))?;

        // A page without tags keeps the stored ones
        if !detail.tags.is_empty() {
            problem.tags = detail.tags;
        }
        problem.category = classify(&problem.tags);
        problem.updated_at = now_millis();
        ctx.problem_store.upsert(&problem)
    }
}
