use super::classify;
use crate::collector::context::CollectorContext;
use crate::collector::job::{CollectionJob, JobKind};
use crate::collector::status::now_millis;
use crate::problem_store::Problem;
use crate::sources::{FetchError, ProblemMetadata};
use anyhow::Result;
use async_trait::async_trait;

/// Imports metadata for every id of an inclusive range from the metadata API.
pub struct MetadataImportJob {
    pub start: u32,
    pub end: u32,
}

#[async_trait]
impl CollectionJob for MetadataImportJob {
    type Payload = ProblemMetadata;

    fn kind(&self) -> JobKind {
        JobKind::MetadataImport
    }

    async fn resolve_work_set(
        &self,
        _ctx: &CollectorContext,
        after: Option<u32>,
    ) -> Result<Vec<u32>> {
        if self.start > self.end {
            anyhow::bail!("empty range [{}, {}]", self.start, self.end);
        }
        let first = match after {
            Some(cursor) if cursor >= self.end => return Ok(vec![]),
            Some(cursor) => self.start.max(cursor + 1),
            None => self.start,
        };
        Ok((first..=self.end).collect())
    }

    async fn fetch_item(
        &self,
        ctx: &CollectorContext,
        problem_id: u32,
    ) -> Result<ProblemMetadata, FetchError> {
        ctx.metadata_source.fetch(problem_id).await
    }

    async fn map_and_persist(&self, ctx: &CollectorContext, metadata: ProblemMetadata) -> Result<()> {
        // Crawled detail fields survive a metadata refresh
        let existing = ctx.problem_store.get(metadata.problem_id)?;
        let category = classify(&metadata.tags);
        let problem = Problem {
            problem_id: metadata.problem_id,
            title: metadata.title,
            level: metadata.level,
            accepted_user_count: metadata.accepted_user_count,
            average_tries: metadata.average_tries,
            tags: metadata.tags,
            category,
            description: existing.as_ref().and_then(|p| p.description.clone()),
            input_description: existing.as_ref().and_then(|p| p.input_description.clone()),
            output_description: existing.and_then(|p| p.output_description),
            updated_at: now_millis(),
        };
        ctx.problem_store.upsert(&problem)
    }
}
