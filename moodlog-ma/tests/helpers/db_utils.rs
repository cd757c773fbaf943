//! Database Test Utilities

use anyhow::Result;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create temporary test database with tables initialized
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_moodlog.db");

    let pool = moodlog_ma::db::init_database_pool(&db_path).await?;

    Ok((temp_dir, pool))
}

/// Raw `analysis_status` column of an entry
pub async fn stored_status(pool: &SqlitePool, id: uuid::Uuid) -> Result<String> {
    let status = sqlx::query_scalar::<_, String>(
        "SELECT analysis_status FROM journal_entries WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(status)
}
