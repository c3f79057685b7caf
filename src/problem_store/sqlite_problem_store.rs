use super::models::{Problem, ProblemCategory, ProblemFilter};
use super::schema::PROBLEM_VERSIONED_SCHEMAS;
use super::ProblemStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "problem_id, title, level, accepted_user_count, average_tries, tags, \
     category, description, input_description, output_description, updated_at";

/// Position of `tags` in `SELECT_COLUMNS`.
const TAGS_COLUMN_INDEX: usize = 5;

pub struct SqliteProblemStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProblemStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path.as_ref(), PROBLEM_VERSIONED_SCHEMAS, "problem")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_problem(row: &rusqlite::Row) -> rusqlite::Result<Problem> {
        let problem_id: u32 = row.get("problem_id")?;
        let tags_json: String = row.get("tags")?;
        let category_str: String = row.get("category")?;
        let accepted: i64 = row.get("accepted_user_count")?;

        let tags = serde_json::from_str(&tags_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                TAGS_COLUMN_INDEX,
                Type::Text,
                format!("invalid tags of problem {}: {}", problem_id, e).into(),
            )
        })?;

        Ok(Problem {
            problem_id,
            title: row.get("title")?,
            level: row.get("level")?,
            accepted_user_count: accepted.max(0) as u64,
            average_tries: row.get("average_tries")?,
            tags,
            category: ProblemCategory::parse(&category_str).unwrap_or(ProblemCategory::Other),
            description: row.get("description")?,
            input_description: row.get("input_description")?,
            output_description: row.get("output_description")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl ProblemStore for SqliteProblemStore {
    fn upsert(&self, problem: &Problem) -> Result<()> {
        let tags_json = serde_json::to_string(&problem.tags).context("Failed to encode tags")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO problems (problem_id, title, level, accepted_user_count, average_tries,
                                   tags, category, updated_at, description, input_description,
                                   output_description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(problem_id) DO UPDATE SET
                title = ?2, level = ?3, accepted_user_count = ?4, average_tries = ?5,
                tags = ?6, category = ?7, updated_at = ?8, description = ?9,
                input_description = ?10, output_description = ?11",
            params![
                problem.problem_id,
                problem.title,
                problem.level,
                problem.accepted_user_count.min(i64::MAX as u64) as i64,
                problem.average_tries,
                tags_json,
                problem.category.as_str(),
                problem.updated_at,
                problem.description,
                problem.input_description,
                problem.output_description,
            ],
        )?;
        Ok(())
    }

    fn get(&self, problem_id: u32) -> Result<Option<Problem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM problems WHERE problem_id = ?1",
            SELECT_COLUMNS
        ))?;
        let problem = stmt
            .query_row(params![problem_id], Self::row_to_problem)
            .optional()?;
        Ok(problem)
    }

    fn find_matching(
        &self,
        filter: ProblemFilter,
        after: Option<u32>,
        limit: Option<usize>,
    ) -> Result<Vec<Problem>> {
        let filter_clause = match filter {
            ProblemFilter::All => "",
            ProblemFilter::MissingDetail => {
                "AND (description IS NULL OR input_description IS NULL OR output_description IS NULL)"
            }
        };
        // Ids start at 1, so -1 keeps every row
        let after = after.map(i64::from).unwrap_or(-1);
        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map(|l| l.min(i64::MAX as usize) as i64).unwrap_or(-1);

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM problems WHERE problem_id > ?1 {} ORDER BY problem_id ASC LIMIT ?2",
            SELECT_COLUMNS, filter_clause
        ))?;
        let problems = stmt
            .query_map(params![after, limit], Self::row_to_problem)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(problems)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM problems", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
