//! On-demand video job reconciliation
//!
//! There is no background polling. A LOADING video entry is brought up to date
//! only when someone asks: one status query per call (transport retries
//! aside), and a terminal job state is fed back through the entry store.

use moodlog_common::{AnalysisStatus, Error, Result};
use std::sync::Arc;
use uuid::Uuid;

use super::entry_store::{ApplyOutcome, EntryStore};
use crate::models::{AnalysisPayload, EmotionData, EntryKind};
use crate::types::{EmotionProvider, JobState, RawPredictions};
use crate::utils::RetryPolicy;

/// Result of one reconcile call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Job queued or running (or not submitted yet); entry untouched
    StillProcessing,
    /// Job finished; emotion data applied with SUCCESS
    Completed,
    /// Job failed or the provider rejected the query; entry set to ERROR
    Failed,
    /// Provider unreachable after retries; entry stays LOADING
    Unavailable,
    /// Nothing to query; carries the entry's current status
    Settled(AnalysisStatus),
}

/// Turns raw job predictions into entry emotion data
///
/// Per modality present: the first group's first prediction, verbatim.
/// Modalities without any prediction are omitted.
pub fn extract_emotion_data(raw: &RawPredictions) -> EmotionData {
    let mut data = EmotionData::new();

    for (modality, groups) in &raw.modalities {
        let first = groups
            .first()
            .and_then(|group| group.predictions.first());

        if let Some(prediction) = first {
            data.insert(*modality, prediction.emotions.clone());
        }
    }

    data
}

/// Queries video job status and applies terminal results
#[derive(Clone)]
pub struct StatusReconciler {
    emotion: Arc<dyn EmotionProvider>,
    retry: RetryPolicy,
}

impl StatusReconciler {
    pub fn new(emotion: Arc<dyn EmotionProvider>, retry: RetryPolicy) -> Self {
        Self { emotion, retry }
    }

    /// Reconcile one entry with its provider job
    ///
    /// # Errors
    /// `Error::NotFound` if the entry is not (or no longer) in the store.
    pub async fn reconcile(&self, store: &EntryStore, entry_id: Uuid) -> Result<ReconcileOutcome> {
        let entry = store
            .get(entry_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Entry {}", entry_id)))?;

        let job_id = match (&entry.kind, entry.status) {
            (EntryKind::Video(video), AnalysisStatus::Loading) => match &video.job_id {
                Some(job_id) => job_id.clone(),
                // Submission still in flight
                None => return Ok(ReconcileOutcome::StillProcessing),
            },
            (_, status) => return Ok(ReconcileOutcome::Settled(status)),
        };

        let emotion = &self.emotion;
        let status = match self
            .retry
            .run("job status query", || emotion.job_status(&job_id))
            .await
        {
            Ok(status) => status,
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    entry_id = %entry_id,
                    job_id = %job_id,
                    error = %e,
                    "Emotion provider unavailable, entry left LOADING"
                );
                return Ok(ReconcileOutcome::Unavailable);
            }
            Err(e) => {
                tracing::warn!(
                    entry_id = %entry_id,
                    job_id = %job_id,
                    error = %e,
                    "Emotion job status rejected"
                );
                return self
                    .settle(store, entry_id, None, AnalysisStatus::Error, ReconcileOutcome::Failed)
                    .await;
            }
        };

        match status.state {
            JobState::Queued | JobState::InProgress => {
                tracing::debug!(entry_id = %entry_id, job_id = %job_id, state = ?status.state, "Emotion job still processing");
                Ok(ReconcileOutcome::StillProcessing)
            }
            JobState::Completed => {
                let data = status
                    .predictions
                    .as_ref()
                    .map(extract_emotion_data)
                    .unwrap_or_default();

                tracing::info!(
                    entry_id = %entry_id,
                    job_id = %job_id,
                    modalities = data.modalities().count(),
                    "Emotion job completed"
                );

                self.settle(
                    store,
                    entry_id,
                    Some(AnalysisPayload::Emotion(data)),
                    AnalysisStatus::Success,
                    ReconcileOutcome::Completed,
                )
                .await
            }
            JobState::Failed => {
                tracing::warn!(entry_id = %entry_id, job_id = %job_id, "Emotion job failed");
                self.settle(store, entry_id, None, AnalysisStatus::Error, ReconcileOutcome::Failed)
                    .await
            }
        }
    }

    async fn settle(
        &self,
        store: &EntryStore,
        entry_id: Uuid,
        payload: Option<AnalysisPayload>,
        status: AnalysisStatus,
        outcome: ReconcileOutcome,
    ) -> Result<ReconcileOutcome> {
        match store.apply_analysis_result(entry_id, payload, status).await? {
            ApplyOutcome::Missing => Err(Error::NotFound(format!(
                "Entry {} removed during reconcile",
                entry_id
            ))),
            ApplyOutcome::Applied | ApplyOutcome::Unchanged => Ok(outcome),
        }
    }
}
