//! Collaborator ports for mood analysis
//!
//! The entry store and analysis services depend only on these traits:
//! - [`EntryRepository`]: durable, principal-scoped entry persistence
//! - [`SentimentProvider`]: single-call text mood analysis
//! - [`EmotionProvider`]: submit-job / poll-job video emotion analysis
//!
//! Concrete implementations live in `db` (SQLite, in-memory) and `services`
//! (HTTP clients). Tests supply scripted fakes.

use async_trait::async_trait;
use moodlog_common::{AnalysisStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{AnalysisPayload, EmotionScore, Entry, Modality, MoodMetadata, NewEntry};

/// Durable entry storage scoped to the authenticated principal
///
/// # Errors
/// Implementations report `Error::Auth` when no principal is active,
/// `Error::NotFound` for ids the principal does not own, and transport or
/// storage failures as `Error::Network` / `Error::Server` / `Error::Database`.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Persist a new entry and return it with its assigned id
    async fn create(&self, entry: NewEntry) -> Result<Entry>;

    /// All entries of the current principal, newest first
    async fn list(&self) -> Result<Vec<Entry>>;

    /// Persist analysis payload and status for an entry
    async fn update_analysis(
        &self,
        id: Uuid,
        payload: Option<&AnalysisPayload>,
        status: AnalysisStatus,
    ) -> Result<()>;

    /// Record the emotion provider job handle for a video entry
    async fn update_job(&self, id: Uuid, job_id: Option<&str>) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Text mood analysis
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    async fn analyze(&self, text: &str) -> Result<MoodMetadata>;
}

/// Long-running video emotion analysis
#[async_trait]
pub trait EmotionProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Register media for analysis, returning the provider's job id
    async fn submit_job(&self, media_url: &str) -> Result<String>;

    /// Query a job once
    async fn job_status(&self, job_id: &str) -> Result<JobStatus>;
}

/// Provider-side job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    InProgress,
    Completed,
    Failed,
}

/// Result of a single job status query
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    /// Present only for completed jobs
    pub predictions: Option<RawPredictions>,
}

impl JobStatus {
    pub fn pending(state: JobState) -> Self {
        Self {
            state,
            predictions: None,
        }
    }

    pub fn completed(predictions: RawPredictions) -> Self {
        Self {
            state: JobState::Completed,
            predictions: Some(predictions),
        }
    }
}

/// Raw provider predictions for one job
///
/// Per modality: prediction groups, each holding predictions, each holding an
/// ordered emotion list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPredictions {
    pub modalities: BTreeMap<Modality, Vec<PredictionGroup>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionGroup {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub emotions: Vec<EmotionScore>,
}

impl RawPredictions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a modality holding a single group with a single prediction
    pub fn with_modality(mut self, modality: Modality, emotions: Vec<EmotionScore>) -> Self {
        self.modalities.insert(
            modality,
            vec![PredictionGroup {
                predictions: vec![Prediction { emotions }],
            }],
        );
        self
    }
}
