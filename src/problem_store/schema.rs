//! SQLite schema for the problem database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Problem metadata
// =============================================================================

const PROBLEMS_TABLE_V1: Table = Table {
    name: "problems",
    columns: &[
        sqlite_column!("problem_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("level", &SqlType::Integer, non_null = true),
        sqlite_column!("accepted_user_count", &SqlType::Integer, non_null = true),
        sqlite_column!("average_tries", &SqlType::Real, non_null = true),
        // JSON array of tag keys
        sqlite_column!("tags", &SqlType::Text, non_null = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_problems_category", "category")],
};

// =============================================================================
// Version 2 - Crawled detail fields
// =============================================================================

const PROBLEMS_TABLE_V2: Table = Table {
    name: "problems",
    columns: &[
        sqlite_column!("problem_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("level", &SqlType::Integer, non_null = true),
        sqlite_column!("accepted_user_count", &SqlType::Integer, non_null = true),
        sqlite_column!("average_tries", &SqlType::Real, non_null = true),
        sqlite_column!("tags", &SqlType::Text, non_null = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("input_description", &SqlType::Text),
        sqlite_column!("output_description", &SqlType::Text),
    ],
    indices: &[("idx_problems_category", "category")],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute("ALTER TABLE problems ADD COLUMN description TEXT", [])?;
    conn.execute("ALTER TABLE problems ADD COLUMN input_description TEXT", [])?;
    conn.execute("ALTER TABLE problems ADD COLUMN output_description TEXT", [])?;
    Ok(())
}

pub const PROBLEM_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[PROBLEMS_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[PROBLEMS_TABLE_V2],
        migration: Some(migrate_v1_to_v2),
    },
];
