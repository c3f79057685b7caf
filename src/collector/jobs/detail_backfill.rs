use super::classify;
use crate::collector::context::CollectorContext;
use crate::collector::job::{CollectionJob, JobKind};
use crate::collector::status::now_millis;
use crate::problem_store::ProblemFilter;
use crate::sources::{FetchError, ProblemDetail};
use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Crawls the statement of every stored problem that still lacks one.
pub struct DetailBackfillJob {
    pub limit: Option<usize>,
}

#[async_trait]
impl CollectionJob for DetailBackfillJob {
    type Payload = ProblemDetail;

    fn kind(&self) -> JobKind {
        JobKind::DetailBackfill
    }

    /// `limit` counts items past the resume cursor, so a resumed backfill
    /// still gets up to `limit` fresh problems.
    async fn resolve_work_set(
        &self,
        ctx: &CollectorContext,
        after: Option<u32>,
    ) -> Result<Vec<u32>> {
        let problems = ctx
            .problem_store
            .find_matching(ProblemFilter::MissingDetail, after, self.limit)?;
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

        problem.description = Some(detail.description);
        problem.input_description = Some(detail.input_description);
        problem.output_description = Some(detail.output_description);
        if problem.tags.is_empty() && !detail.tags.is_empty() {
            problem.tags = detail.tags;
            problem.category = classify(&problem.tags);
        }
        problem.updated_at = now_millis();
        ctx.problem_store.upsert(&problem)
    }
}
