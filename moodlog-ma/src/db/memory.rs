//! In-memory entry repository
//!
//! Principal-scoped repository with no persistence beyond the process. Used for
//! offline runs and as the default collaborator in tests.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use moodlog_common::{AnalysisStatus, Error, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{AnalysisPayload, Entry, EntryKind, NewEntry};
use crate::types::EntryRepository;

/// In-memory [`EntryRepository`]
///
/// Every call requires a signed-in principal; entries of other principals are
/// invisible (listed nowhere, `NotFound` on update/delete).
pub struct InMemoryEntryRepository {
    principal: RwLock<Option<String>>,
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl InMemoryEntryRepository {
    /// Repository signed in as `owner_id`
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            principal: RwLock::new(Some(owner_id.into())),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Repository with no active principal
    pub fn signed_out() -> Self {
        Self {
            principal: RwLock::new(None),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn sign_in(&self, owner_id: impl Into<String>) {
        *self.principal.write().await = Some(owner_id.into());
    }

    pub async fn sign_out(&self) {
        *self.principal.write().await = None;
    }

    /// Stored copy of an entry regardless of principal (test inspection)
    pub async fn stored(&self, id: Uuid) -> Option<Entry> {
        self.entries.read().await.get(&id).cloned()
    }

    async fn current_principal(&self) -> Result<String> {
        self.principal
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Auth("No active principal".to_string()))
    }
}

#[async_trait]
impl EntryRepository for InMemoryEntryRepository {
    async fn create(&self, entry: NewEntry) -> Result<Entry> {
        let owner_id = self.current_principal().await?;
        let created = entry.into_entry(Uuid::new_v4(), owner_id, Utc::now().trunc_subsecs(6));

        self.entries
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Entry>> {
        let owner_id = self.current_principal().await?;
        let mut entries: Vec<Entry> = self
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn update_analysis(
        &self,
        id: Uuid,
        payload: Option<&AnalysisPayload>,
        status: AnalysisStatus,
    ) -> Result<()> {
        let owner_id = self.current_principal().await?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .filter(|e| e.owner_id == owner_id)
            .ok_or_else(|| Error::NotFound(format!("Entry {}", id)))?;

        entry.apply_analysis(payload.cloned(), status, Utc::now().trunc_subsecs(6))?;
        Ok(())
    }

    async fn update_job(&self, id: Uuid, job_id: Option<&str>) -> Result<()> {
        let owner_id = self.current_principal().await?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .filter(|e| e.owner_id == owner_id)
            .ok_or_else(|| Error::NotFound(format!("Entry {}", id)))?;

        match &mut entry.kind {
            EntryKind::Video(video) => {
                video.job_id = job_id.map(str::to_string);
                entry.updated_at = Utc::now().trunc_subsecs(6);
                Ok(())
            }
            EntryKind::Text(_) => Err(Error::InvalidInput(format!(
                "Entry {} is not a video entry",
                id
            ))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let owner_id = self.current_principal().await?;
        let mut entries = self.entries.write().await;

        match entries.get(&id) {
            Some(entry) if entry.owner_id == owner_id => {
                entries.remove(&id);
                Ok(())
            }
            _ => Err(Error::NotFound(format!("Entry {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaRef;

    #[tokio::test]
    async fn test_signed_out_calls_fail_with_auth() {
        let repo = InMemoryEntryRepository::signed_out();
        let result = repo.create(NewEntry::text("hello").unwrap()).await;
        assert!(matches!(result, Err(Error::Auth(_))));
        assert!(matches!(repo.list().await, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_entries_are_scoped_to_principal() {
        let repo = InMemoryEntryRepository::new("alice");
        let entry = repo.create(NewEntry::text("alice's day").unwrap()).await.unwrap();
        assert_eq!(entry.owner_id, "alice");
        assert_eq!(entry.status, AnalysisStatus::Pending);

        repo.sign_in("bob").await;
        assert!(repo.list().await.unwrap().is_empty());
        assert!(matches!(repo.delete(entry.id).await, Err(Error::NotFound(_))));

        repo.sign_in("alice").await;
        assert_eq!(repo.list().await.unwrap().len(), 1);
        repo.delete(entry.id).await.unwrap();
        assert!(repo.stored(entry.id).await.is_none());
    }

    #[tokio::test]
    async fn test_update_job_only_for_video() {
        let repo = InMemoryEntryRepository::new("alice");
        let text = repo.create(NewEntry::text("words").unwrap()).await.unwrap();
        let video = repo
            .create(NewEntry::video(MediaRef::new("https://cdn.example/a.mp4"), 12.0).unwrap())
            .await
            .unwrap();

        assert!(repo.update_job(text.id, Some("job-1")).await.is_err());
        repo.update_job(video.id, Some("job-1")).await.unwrap();
        assert_eq!(repo.stored(video.id).await.unwrap().job_id(), Some("job-1"));
    }
}
