//! Analysis dispatch
//!
//! Runs one analysis round for a freshly created (or re-analyzed) entry. The
//! text path calls the sentiment provider and always ends in a terminal status.
//! The video path only submits a job; the entry stays LOADING until a later
//! reconcile finds the job finished.
//!
//! Provider failures never escape: they are logged and surface as ERROR status.

use moodlog_common::AnalysisStatus;
use std::sync::Arc;
use uuid::Uuid;

use super::entry_store::{ApplyOutcome, EntryStore};
use crate::models::AnalysisPayload;
use crate::types::{EmotionProvider, SentimentProvider};
use crate::utils::RetryPolicy;

/// Invokes analysis providers through the retry policy and reports results
/// back to the entry store
#[derive(Clone)]
pub struct AnalysisDispatcher {
    sentiment: Arc<dyn SentimentProvider>,
    emotion: Arc<dyn EmotionProvider>,
    retry: RetryPolicy,
}

impl AnalysisDispatcher {
    pub fn new(
        sentiment: Arc<dyn SentimentProvider>,
        emotion: Arc<dyn EmotionProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            sentiment,
            emotion,
            retry,
        }
    }

    /// Text round: sentiment analysis, then SUCCESS with mood or ERROR
    pub async fn analyze_text(&self, store: &EntryStore, entry_id: Uuid, content: &str) {
        let sentiment = &self.sentiment;
        let result = self
            .retry
            .run("sentiment analysis", || sentiment.analyze(content))
            .await;

        let mood = match result {
            Ok(mood) => mood,
            Err(e) => {
                tracing::warn!(
                    entry_id = %entry_id,
                    provider = sentiment.name(),
                    error = %e,
                    "Sentiment analysis failed"
                );
                mark_error(store, entry_id).await;
                return;
            }
        };

        match store
            .apply_analysis_result(
                entry_id,
                Some(AnalysisPayload::Mood(mood)),
                AnalysisStatus::Success,
            )
            .await
        {
            Ok(ApplyOutcome::Missing) => {
                tracing::debug!(entry_id = %entry_id, "Entry removed before sentiment result arrived");
            }
            Ok(_) => {
                tracing::info!(entry_id = %entry_id, "Text entry analyzed");
            }
            Err(e) => {
                // Provider answered with scores the entry cannot hold
                tracing::warn!(entry_id = %entry_id, error = %e, "Sentiment result rejected");
                mark_error(store, entry_id).await;
            }
        }
    }

    /// Video round: submit an emotion job and record its id
    pub async fn submit_video(&self, store: &EntryStore, entry_id: Uuid, media_url: &str) {
        let emotion = &self.emotion;
        let result = self
            .retry
            .run("job submission", || emotion.submit_job(media_url))
            .await;

        match result {
            Ok(job_id) => {
                if !store.record_job(entry_id, job_id).await {
                    tracing::debug!(entry_id = %entry_id, "Entry removed before job was recorded");
                }
            }
            Err(e) => {
                tracing::warn!(
                    entry_id = %entry_id,
                    provider = emotion.name(),
                    error = %e,
                    "Emotion job submission failed"
                );
                mark_error(store, entry_id).await;
            }
        }
    }
}

async fn mark_error(store: &EntryStore, entry_id: Uuid) {
    if let Err(e) = store
        .apply_analysis_result(entry_id, None, AnalysisStatus::Error)
        .await
    {
        tracing::error!(entry_id = %entry_id, error = %e, "Failed to mark entry as ERROR");
    }
}
