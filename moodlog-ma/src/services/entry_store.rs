//! Entry store
//!
//! The in-memory source of truth for the journal. Creation persists through the
//! repository first, then inserts the entry at the head of the collection in
//! LOADING and spawns its analysis round; the caller never waits for analysis.
//!
//! Every local mutation takes the collection's write lock for a synchronous
//! critical section, so background rounds reporting back cannot interleave.
//! Late reports for removed entries are no-ops.

use chrono::{SubsecRound, Utc};
use moodlog_common::events::{EventBus, JournalEvent};
use moodlog_common::{AnalysisStatus, Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use super::analysis_dispatcher::AnalysisDispatcher;
use super::status_reconciler::{ReconcileOutcome, StatusReconciler};
use crate::models::{AnalysisPayload, Entry, EntryKind, MediaRef, NewEntry};
use crate::types::{EmotionProvider, EntryRepository, SentimentProvider};
use crate::utils::RetryPolicy;

/// Result of [`EntryStore::apply_analysis_result`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Entry state changed
    Applied,
    /// Entry already held this exact result
    Unchanged,
    /// No such entry (removed, or never known locally)
    Missing,
}

/// Work one analysis round needs, captured under the lock
enum Round {
    Text { content: String },
    /// `clear_stale_job` drops a previous round's stored job before submitting
    Video {
        media_url: String,
        clear_stale_job: bool,
    },
}

impl Round {
    fn for_entry(entry: &Entry) -> Self {
        match &entry.kind {
            EntryKind::Text(text) => Round::Text {
                content: text.content.clone(),
            },
            EntryKind::Video(video) => Round::Video {
                media_url: video.media_url.clone(),
                clear_stale_job: false,
            },
        }
    }
}

struct StoreInner {
    entries: RwLock<Vec<Entry>>,
    repository: Arc<dyn EntryRepository>,
    dispatcher: AnalysisDispatcher,
    reconciler: StatusReconciler,
    retry: RetryPolicy,
    event_bus: EventBus,
    tasks: TaskTracker,
}

/// Cloneable handle to the journal's entry collection
///
/// Clones share one collection; pass the handle to every consumer.
#[derive(Clone)]
pub struct EntryStore {
    inner: Arc<StoreInner>,
}

impl EntryStore {
    pub fn new(
        repository: Arc<dyn EntryRepository>,
        sentiment: Arc<dyn SentimentProvider>,
        emotion: Arc<dyn EmotionProvider>,
        retry: RetryPolicy,
        event_bus: EventBus,
    ) -> Self {
        let dispatcher = AnalysisDispatcher::new(sentiment, emotion.clone(), retry.clone());
        let reconciler = StatusReconciler::new(emotion, retry.clone());

        Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(Vec::new()),
                repository,
                dispatcher,
                reconciler,
                retry,
                event_bus,
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Snapshot of all entries, newest first
    pub async fn list(&self) -> Vec<Entry> {
        self.inner.entries.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Entry> {
        self.inner
            .entries
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Subscribe to entry lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<JournalEvent> {
        self.inner.event_bus.subscribe()
    }

    /// Create a text entry and start its sentiment analysis
    ///
    /// # Errors
    /// `Error::Validation` for empty content (nothing persisted); repository
    /// errors unchanged (collection untouched).
    pub async fn create_text(&self, content: impl Into<String>) -> Result<Entry> {
        let new_entry = NewEntry::text(content)?;
        self.create(new_entry).await
    }

    /// Create a video entry and submit its emotion analysis job
    ///
    /// # Errors
    /// `Error::Validation` for an empty media URL or a negative / non-finite
    /// duration; repository errors unchanged.
    pub async fn create_video(&self, media: MediaRef, duration: f64) -> Result<Entry> {
        let new_entry = NewEntry::video(media, duration)?;
        self.create(new_entry).await
    }

    async fn create(&self, new_entry: NewEntry) -> Result<Entry> {
        let kind = new_entry.kind_tag();
        let mut entry = self.inner.repository.create(new_entry).await.map_err(|e| {
            tracing::warn!(kind = ?kind, error = %e, "Failed to persist new entry");
            e
        })?;

        let persisted_status = entry.status;
        entry.apply_analysis(None, AnalysisStatus::Loading, entry.updated_at)?;

        self.inner.entries.write().await.insert(0, entry.clone());

        tracing::info!(entry_id = %entry.id, kind = ?kind, "Journal entry created");

        let now = Utc::now();
        self.inner.event_bus.emit_lossy(JournalEvent::EntryCreated {
            entry_id: entry.id,
            kind,
            timestamp: now,
        });
        self.emit_status_change(entry.id, persisted_status, AnalysisStatus::Loading);

        self.spawn_round(entry.id, Round::for_entry(&entry));
        Ok(entry)
    }

    /// Delete an entry from the repository, then from the collection
    ///
    /// Analysis results arriving afterwards are ignored.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        self.inner.repository.delete(id).await?;

        let removed = {
            let mut entries = self.inner.entries.write().await;
            let before = entries.len();
            entries.retain(|e| e.id != id);
            entries.len() != before
        };

        tracing::info!(entry_id = %id, was_loaded = removed, "Journal entry removed");
        self.inner.event_bus.emit_lossy(JournalEvent::EntryRemoved {
            entry_id: id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Apply an analysis result to an entry
    ///
    /// Re-applying the current state is a no-op (`Unchanged`); an unknown id is
    /// a no-op (`Missing`). A SUCCESS that changed state is persisted in the
    /// background, best effort.
    ///
    /// # Errors
    /// `Error::InvalidInput` if the payload does not fit the status or the
    /// entry's kind.
    pub async fn apply_analysis_result(
        &self,
        id: Uuid,
        payload: Option<AnalysisPayload>,
        status: AnalysisStatus,
    ) -> Result<ApplyOutcome> {
        let old_status = {
            let mut entries = self.inner.entries.write().await;
            let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
                tracing::debug!(entry_id = %id, status = %status, "Analysis result for unknown entry ignored");
                return Ok(ApplyOutcome::Missing);
            };

            let old_status = entry.status;
            if !entry.apply_analysis(payload.clone(), status, Utc::now().trunc_subsecs(6))? {
                return Ok(ApplyOutcome::Unchanged);
            }
            old_status
        };

        tracing::debug!(entry_id = %id, old_status = %old_status, new_status = %status, "Analysis result applied");
        self.emit_status_change(id, old_status, status);

        if let (AnalysisStatus::Success, Some(payload)) = (status, payload) {
            self.spawn_persist_analysis(id, payload);
        }

        Ok(ApplyOutcome::Applied)
    }

    /// Query the emotion provider once for a LOADING video entry
    pub async fn reconcile(&self, id: Uuid) -> Result<ReconcileOutcome> {
        self.inner.reconciler.reconcile(self, id).await
    }

    /// Reload the collection from the repository
    ///
    /// Entries LOADING locally keep their in-flight state, and local SUCCESS
    /// results the repository has not stored yet are kept and written again.
    /// Entries created while the repository was being listed stay in the
    /// collection; entries removed meanwhile do not come back. Everything else
    /// takes the status its stored payload and job handle imply.
    pub async fn refresh(&self) -> Result<Vec<Entry>> {
        let known_before: HashSet<Uuid> =
            self.inner.entries.read().await.iter().map(|e| e.id).collect();
        let stored = self.inner.repository.list().await?;

        let mut entries = self.inner.entries.write().await;
        let stored_ids: HashSet<Uuid> = stored.iter().map(|e| e.id).collect();

        // Created during the listing, already newest
        let mut refreshed: Vec<Entry> = entries
            .iter()
            .filter(|local| !known_before.contains(&local.id) && !stored_ids.contains(&local.id))
            .cloned()
            .collect();
        let mut unsaved = Vec::new();

        for mut entry in stored {
            match entries.iter().find(|local| local.id == entry.id) {
                None if known_before.contains(&entry.id) => {}
                Some(local) if local.status == AnalysisStatus::Loading => {
                    refreshed.push(local.clone());
                }
                Some(local)
                    if local.status == AnalysisStatus::Success
                        && local.payload() != entry.payload() =>
                {
                    if let Some(payload) = local.payload() {
                        unsaved.push((local.id, payload));
                    }
                    refreshed.push(local.clone());
                }
                _ => {
                    entry.status = entry.derive_loaded_status();
                    refreshed.push(entry);
                }
            }
        }

        *entries = refreshed.clone();
        drop(entries);

        tracing::info!(
            count = refreshed.len(),
            unsaved = unsaved.len(),
            "Journal entries refreshed"
        );
        for (id, payload) in unsaved {
            self.spawn_persist_analysis(id, payload);
        }
        Ok(refreshed)
    }

    /// Start a new analysis round for an entry whose last round ended in ERROR
    ///
    /// # Errors
    /// `Error::NotFound` for an unknown id; `Error::InvalidInput` if the entry
    /// is not in ERROR.
    pub async fn reanalyze(&self, id: Uuid) -> Result<Entry> {
        let (entry, old_status, stale_job) = {
            let mut entries = self.inner.entries.write().await;
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| Error::NotFound(format!("Entry {}", id)))?;

            if entry.status != AnalysisStatus::Error {
                return Err(Error::InvalidInput(format!(
                    "Entry {} is {}, only ERROR entries can be re-analyzed",
                    id, entry.status
                )));
            }

            let old_status = entry.status;
            entry.apply_analysis(None, AnalysisStatus::Loading, Utc::now().trunc_subsecs(6))?;
            let stale_job = match &mut entry.kind {
                EntryKind::Video(video) => video.job_id.take(),
                EntryKind::Text(_) => None,
            };
            (entry.clone(), old_status, stale_job)
        };

        tracing::info!(entry_id = %id, "Re-analyzing journal entry");
        self.emit_status_change(id, old_status, AnalysisStatus::Loading);

        let round = match Round::for_entry(&entry) {
            Round::Video { media_url, .. } => Round::Video {
                media_url,
                clear_stale_job: stale_job.is_some(),
            },
            text => text,
        };
        self.spawn_round(id, round);
        Ok(entry)
    }

    /// Wait for every background task spawned so far (and any they spawn)
    pub async fn wait_idle(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
    }

    /// Record a submitted job on a video entry
    ///
    /// Returns false if the entry is gone or not a video entry.
    pub(crate) async fn record_job(&self, id: Uuid, job_id: String) -> bool {
        {
            let mut entries = self.inner.entries.write().await;
            let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
                return false;
            };
            match &mut entry.kind {
                EntryKind::Video(video) => video.job_id = Some(job_id.clone()),
                EntryKind::Text(_) => return false,
            }
            entry.updated_at = Utc::now().trunc_subsecs(6);
        }

        tracing::info!(entry_id = %id, job_id = %job_id, "Emotion job recorded");
        self.inner.event_bus.emit_lossy(JournalEvent::AnalysisJobSubmitted {
            entry_id: id,
            job_id: job_id.clone(),
            timestamp: Utc::now(),
        });

        self.spawn_persist_job(id, Some(job_id));
        true
    }

    fn emit_status_change(&self, id: Uuid, old_status: AnalysisStatus, new_status: AnalysisStatus) {
        if old_status == new_status {
            return;
        }
        self.inner
            .event_bus
            .emit_lossy(JournalEvent::AnalysisStatusChanged {
                entry_id: id,
                old_status,
                new_status,
                timestamp: Utc::now(),
            });
    }

    fn spawn_round(&self, id: Uuid, round: Round) {
        let store = self.clone();
        self.inner.tasks.spawn(async move {
            let dispatcher = &store.inner.dispatcher;
            match round {
                Round::Text { content } => dispatcher.analyze_text(&store, id, &content).await,
                Round::Video {
                    media_url,
                    clear_stale_job,
                } => {
                    // Cleared before submitting so the new job id is written last
                    if clear_stale_job {
                        store.persist_job(id, None).await;
                    }
                    dispatcher.submit_video(&store, id, &media_url).await
                }
            }
        });
    }

    fn spawn_persist_analysis(&self, id: Uuid, payload: AnalysisPayload) {
        let repository = self.inner.repository.clone();
        let retry = self.inner.retry.clone();

        self.inner.tasks.spawn(async move {
            let result = retry
                .run("analysis persistence", || {
                    repository.update_analysis(id, Some(&payload), AnalysisStatus::Success)
                })
                .await;

            if let Err(e) = result {
                tracing::warn!(entry_id = %id, error = %e, "Failed to persist analysis result");
            }
        });
    }

    fn spawn_persist_job(&self, id: Uuid, job_id: Option<String>) {
        let store = self.clone();
        self.inner.tasks.spawn(async move {
            store.persist_job(id, job_id.as_deref()).await;
        });
    }

    async fn persist_job(&self, id: Uuid, job_id: Option<&str>) {
        let repository = &self.inner.repository;
        let result = self
            .inner
            .retry
            .run("job persistence", || repository.update_job(id, job_id))
            .await;

        if let Err(e) = result {
            tracing::warn!(entry_id = %id, error = %e, "Failed to persist emotion job id");
        }
    }
}
