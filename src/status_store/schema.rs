//! SQLite schema for the job status database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Job status records
// =============================================================================

/// One serialized JobStatus per key, with an absolute expiry (unix millis).
const JOB_STATUS_TABLE_V1: Table = Table {
    name: "job_status",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_job_status_expires_at", "expires_at")],
};

pub const STATUS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[JOB_STATUS_TABLE_V1],
    migration: None,
}];
