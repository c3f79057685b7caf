use super::schema::STATUS_VERSIONED_SCHEMAS;
use super::JobStatusStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct SqliteJobStatusStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJobStatusStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path.as_ref(), STATUS_VERSIONED_SCHEMAS, "job status")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl JobStatusStore for SqliteJobStatusStore {
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Self::now_millis();
        let expires_at = now.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);

        conn.execute(
            "INSERT INTO job_status (key, value, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET value = ?2, expires_at = ?3, updated_at = ?4",
            params![key, value, expires_at, now],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT value FROM job_status WHERE key = ?1 AND expires_at > ?2")?;
        let value: Option<String> = stmt
            .query_row(params![key, Self::now_millis()], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn purge_expired(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM job_status WHERE expires_at <= ?1",
            params![Self::now_millis()],
        )?;
        Ok(deleted)
    }
}
