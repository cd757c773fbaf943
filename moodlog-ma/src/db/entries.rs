//! Journal entry database operations
//!
//! SQLite-backed [`EntryRepository`] scoped to one owner. Analysis payloads are
//! stored as JSON text in the `analysis` column (mood metadata for text
//! entries, emotion data for video entries).

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use moodlog_common::{AnalysisStatus, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    AnalysisPayload, EmotionData, Entry, EntryKind, MoodMetadata, NewEntry, TextEntry, VideoEntry,
};
use crate::types::EntryRepository;

const KIND_TEXT: &str = "text";
const KIND_VIDEO: &str = "video";

/// SQLite [`EntryRepository`]
pub struct SqliteEntryRepository {
    pool: SqlitePool,
    owner_id: Option<String>,
}

impl SqliteEntryRepository {
    /// Repository acting for `owner_id`; `None` means no active principal
    pub fn new(pool: SqlitePool, owner_id: Option<String>) -> Self {
        Self { pool, owner_id }
    }

    fn owner(&self) -> Result<&str> {
        self.owner_id
            .as_deref()
            .filter(|owner| !owner.trim().is_empty())
            .ok_or_else(|| Error::Auth("No active principal".to_string()))
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn serialize_payload(payload: Option<&AnalysisPayload>) -> Result<Option<String>> {
    let json = match payload {
        Some(AnalysisPayload::Mood(mood)) => serde_json::to_string(mood),
        Some(AnalysisPayload::Emotion(emotion)) => serde_json::to_string(emotion),
        None => return Ok(None),
    };
    json.map(Some)
        .map_err(|e| Error::Internal(format!("Failed to serialize analysis: {}", e)))
}

fn entry_from_row(row: &SqliteRow) -> Result<Entry> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse entry id: {}", e)))?;

    let kind: String = row.try_get("kind")?;
    let analysis: Option<String> = row.try_get("analysis")?;

    let kind = match kind.as_str() {
        KIND_TEXT => {
            let mood = analysis
                .map(|json| serde_json::from_str::<MoodMetadata>(&json))
                .transpose()
                .map_err(|e| Error::Internal(format!("Failed to deserialize mood: {}", e)))?;
            EntryKind::Text(TextEntry {
                content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
                mood,
            })
        }
        KIND_VIDEO => {
            let emotion = analysis
                .map(|json| serde_json::from_str::<EmotionData>(&json))
                .transpose()
                .map_err(|e| Error::Internal(format!("Failed to deserialize emotion: {}", e)))?;
            EntryKind::Video(VideoEntry {
                media_url: row.try_get::<Option<String>, _>("media_url")?.unwrap_or_default(),
                thumbnail_url: row.try_get("thumbnail_url")?,
                duration: row.try_get::<Option<f64>, _>("duration")?.unwrap_or(0.0),
                emotion,
                job_id: row.try_get("job_id")?,
            })
        }
        other => {
            return Err(Error::Internal(format!("Unknown entry kind: {}", other)));
        }
    };

    let status: String = row.try_get("analysis_status")?;
    let status = AnalysisStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown analysis status: {}", status)))?;

    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Entry {
        id,
        owner_id: row.try_get("owner_id")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
        status,
        kind,
    })
}

#[async_trait]
impl EntryRepository for SqliteEntryRepository {
    async fn create(&self, entry: NewEntry) -> Result<Entry> {
        let owner_id = self.owner()?.to_string();
        let created = entry.into_entry(Uuid::new_v4(), owner_id, Utc::now().trunc_subsecs(6));

        // Prepare all column values before touching the pool
        let (kind, content, media_url, thumbnail_url, duration) = match &created.kind {
            EntryKind::Text(text) => (KIND_TEXT, Some(text.content.clone()), None, None, None),
            EntryKind::Video(video) => (
                KIND_VIDEO,
                None,
                Some(video.media_url.clone()),
                video.thumbnail_url.clone(),
                Some(video.duration),
            ),
        };
        let timestamp = format_timestamp(&created.created_at);

        sqlx::query(
            r#"
            INSERT INTO journal_entries (
                id, owner_id, kind, content, media_url, thumbnail_url, duration,
                analysis, analysis_status, job_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, NULL, ?, ?)
            "#,
        )
        .bind(created.id.to_string())
        .bind(&created.owner_id)
        .bind(kind)
        .bind(content)
        .bind(media_url)
        .bind(thumbnail_url)
        .bind(duration)
        .bind(created.status.as_str())
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        tracing::debug!(entry_id = %created.id, kind, "Journal entry saved");
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Entry>> {
        let owner_id = self.owner()?;

        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, kind, content, media_url, thumbnail_url, duration,
                   analysis, analysis_status, job_id, created_at, updated_at
            FROM journal_entries
            WHERE owner_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn update_analysis(
        &self,
        id: Uuid,
        payload: Option<&AnalysisPayload>,
        status: AnalysisStatus,
    ) -> Result<()> {
        let owner_id = self.owner()?;
        let analysis = serialize_payload(payload)?;
        let updated_at = format_timestamp(&Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE journal_entries
            SET analysis = ?, analysis_status = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(analysis)
        .bind(status.as_str())
        .bind(updated_at)
        .bind(id.to_string())
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Entry {}", id)));
        }
        Ok(())
    }

    async fn update_job(&self, id: Uuid, job_id: Option<&str>) -> Result<()> {
        let owner_id = self.owner()?;
        let updated_at = format_timestamp(&Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE journal_entries
            SET job_id = ?, updated_at = ?
            WHERE id = ? AND owner_id = ? AND kind = ?
            "#,
        )
        .bind(job_id)
        .bind(updated_at)
        .bind(id.to_string())
        .bind(owner_id)
        .bind(KIND_VIDEO)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Video entry {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let owner_id = self.owner()?;

        let result = sqlx::query("DELETE FROM journal_entries WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Entry {}", id)));
        }
        Ok(())
    }
}
