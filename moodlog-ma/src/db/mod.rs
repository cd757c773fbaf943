//! Database access for moodlog-ma
//!
//! - [`entries`]: SQLite journal entry repository
//! - [`memory`]: in-memory repository for offline runs and tests

pub mod entries;
pub mod memory;

pub use entries::SqliteEntryRepository;
pub use memory::InMemoryEntryRepository;

use moodlog_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the database file (and its parent directory) if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create moodlog tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS journal_entries (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('text', 'video')),
            content TEXT,
            media_url TEXT,
            thumbnail_url TEXT,
            duration REAL,
            analysis TEXT,
            analysis_status TEXT NOT NULL DEFAULT 'PENDING',
            job_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_journal_entries_owner_created \
         ON journal_entries (owner_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (journal_entries)");

    Ok(())
}
