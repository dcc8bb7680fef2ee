//! Additive schema migration.
//!
//! The schema only ever grows: tables are created when missing and columns are
//! appended when `PRAGMA table_info` does not list them. There is no version
//! table and no down-migration; running `run` twice is a no-op.

use crate::domain::errors::{StoreError, StoreResult};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::info;

/// Base tables as first shipped. Later columns arrive via `COLUMN_MIGRATIONS`.
const BASE_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username VARCHAR(150) NOT NULL,
        email VARCHAR(150) NOT NULL UNIQUE,
        password_hash VARCHAR(150) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        document_hash VARCHAR(300) NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_documents_hash_owner ON documents(document_hash, user_id)",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message VARCHAR(300) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ledger_intents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        fingerprint VARCHAR(300) NOT NULL,
        owner_id INTEGER NOT NULL REFERENCES users(id),
        tx_hash TEXT,
        created_at INTEGER NOT NULL
    )",
];

/// A column appended to an existing table.
struct ColumnMigration {
    table: &'static str,
    column: &'static str,
    definition: &'static str,
}

const COLUMN_MIGRATIONS: &[ColumnMigration] = &[
    ColumnMigration {
        table: "users",
        column: "sensitive_data",
        definition: "VARCHAR(500)",
    },
    ColumnMigration {
        table: "users",
        column: "role",
        definition: "TEXT NOT NULL DEFAULT 'member'",
    },
];

/// What a migration run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// `table.column` entries added by this run.
    pub columns_added: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.columns_added.is_empty()
    }
}

pub(crate) async fn run(pool: &SqlitePool) -> StoreResult<MigrationReport> {
    for statement in BASE_SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
    }

    let mut report = MigrationReport::default();
    for migration in COLUMN_MIGRATIONS {
        let existing = column_names(pool, migration.table).await?;
        if existing.contains(migration.column) {
            continue;
        }

        let ddl = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            migration.table, migration.column, migration.definition
        );
        sqlx::query(&ddl)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!(
            table = migration.table,
            column = migration.column,
            "Added column"
        );
        report
            .columns_added
            .push(format!("{}.{}", migration.table, migration.column));
    }

    Ok(report)
}

async fn column_names(pool: &SqlitePool, table: &str) -> StoreResult<HashSet<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|e| StoreError::Migration(e.to_string()))
        })
        .collect()
}
