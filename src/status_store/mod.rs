//! TTL-keyed string store holding one serialized status record per job.
//!
//! The collector uses it both for progress polling and as the checkpoint
//! record a failed job is resumed from. Records are never deleted explicitly;
//! they expire and get purged by a periodic task.

mod memory_status_store;
mod schema;
mod sqlite_status_store;

pub use memory_status_store::InMemoryJobStatusStore;
pub use schema::STATUS_VERSIONED_SCHEMAS;
pub use sqlite_status_store::SqliteJobStatusStore;

use anyhow::Result;
use std::time::Duration;

pub trait JobStatusStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value. The entry
    /// expires `ttl` after this write.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Returns the value stored under `key`, or `None` if it is absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Drops every expired entry, returning how many were removed.
    fn purge_expired(&self) -> Result<usize>;
}
