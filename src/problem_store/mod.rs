mod models;
mod schema;
mod sqlite_problem_store;

pub use models::*;
pub use schema::PROBLEM_VERSIONED_SCHEMAS;
pub use sqlite_problem_store::SqliteProblemStore;

use anyhow::Result;

/// Repository the collector jobs read work sets from and write results to.
pub trait ProblemStore: Send + Sync {
    /// Creates the problem or replaces the stored row with the same `problem_id`.
    fn upsert(&self, problem: &Problem) -> Result<()>;

    fn get(&self, problem_id: u32) -> Result<Option<Problem>>;

    /// Problems matching `filter` with an id greater than `after`, ordered by
    /// ascending `problem_id`. `limit` applies after both filters.
    fn find_matching(
        &self,
        filter: ProblemFilter,
        after: Option<u32>,
        limit: Option<usize>,
    ) -> Result<Vec<Problem>>;

    fn count(&self) -> Result<usize>;
}
