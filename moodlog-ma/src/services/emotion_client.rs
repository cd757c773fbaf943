//! Emotion provider HTTP client (batch job API)
//!
//! Video emotion recognition runs for minutes, so the provider exposes jobs:
//! - `POST {base}/batch/jobs` with `{"urls": [...], "models": {...}}` → `{"job_id"}`
//! - `GET {base}/batch/jobs/{id}` → `{"state": {"status": "QUEUED" | "IN_PROGRESS" | "COMPLETED" | "FAILED"}}`
//! - `GET {base}/batch/jobs/{id}/predictions` → per-source results, each with
//!   `predictions[].models.{modality}.grouped_predictions[].predictions[].emotions[]`
//!
//! A status query for a completed job fetches the predictions in the same call.

use async_trait::async_trait;
use moodlog_common::config::EmotionConfig;
use moodlog_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::http_status::{ensure_success, transport_error};
use crate::models::Modality;
use crate::types::{EmotionProvider, JobState, JobStatus, PredictionGroup, RawPredictions};

const PROVIDER: &str = "Emotion";
const API_KEY_HEADER: &str = "X-Hume-Api-Key";
const USER_AGENT: &str = concat!("moodlog/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct SubmitJobRequest<'a> {
    urls: Vec<&'a str>,
    models: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SubmitJobResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobDetails {
    state: JobStateDetails,
}

#[derive(Debug, Deserialize)]
struct JobStateDetails {
    status: JobState,
}

#[derive(Debug, Deserialize)]
struct SourcePredictions {
    #[serde(default)]
    results: Option<SourceResults>,
}

#[derive(Debug, Deserialize)]
struct SourceResults {
    #[serde(default)]
    predictions: Vec<FilePredictions>,
}

#[derive(Debug, Deserialize)]
struct FilePredictions {
    #[serde(default)]
    models: HashMap<String, ModelPredictions>,
}

#[derive(Debug, Deserialize)]
struct ModelPredictions {
    #[serde(default)]
    grouped_predictions: Vec<PredictionGroup>,
}

/// Convert the provider's predictions listing into per-modality groups
///
/// Uses the first source that produced file predictions, and that source's
/// first file. Unrecognized model names are skipped.
fn into_raw_predictions(sources: Vec<SourcePredictions>) -> RawPredictions {
    let mut raw = RawPredictions::new();

    let first_file = sources
        .into_iter()
        .filter_map(|source| source.results)
        .find_map(|results| results.predictions.into_iter().next());

    if let Some(file) = first_file {
        for (name, model) in file.models {
            match Modality::parse(&name) {
                Some(modality) => {
                    raw.modalities.insert(modality, model.grouped_predictions);
                }
                None => tracing::debug!(model = %name, "Skipping unrecognized emotion model"),
            }
        }
    }

    raw
}

/// HTTP [`EmotionProvider`]
pub struct HttpEmotionClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl HttpEmotionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        models: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            models,
        })
    }

    pub fn from_config(config: &EmotionConfig, api_key: String) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            api_key,
            config.models.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn jobs_url(&self) -> String {
        format!("{}/batch/jobs", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        ensure_success(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{} response parse error: {}", PROVIDER, e)))
    }
}

#[async_trait]
impl EmotionProvider for HttpEmotionClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn submit_job(&self, media_url: &str) -> Result<String> {
        let models = self
            .models
            .iter()
            .map(|m| (m.clone(), Value::Object(Map::new())))
            .collect();

        let response = self
            .http_client
            .post(self.jobs_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&SubmitJobRequest {
                urls: vec![media_url],
                models,
            })
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let submitted: SubmitJobResponse = ensure_success(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{} response parse error: {}", PROVIDER, e)))?;

        tracing::info!(job_id = %submitted.job_id, "Emotion analysis job submitted");
        Ok(submitted.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let details: JobDetails = self
            .get_json(&format!("{}/{}", self.jobs_url(), job_id))
            .await?;

        tracing::debug!(job_id, status = ?details.state.status, "Emotion job status");

        if details.state.status != JobState::Completed {
            return Ok(JobStatus::pending(details.state.status));
        }

        let sources: Vec<SourcePredictions> = self
            .get_json(&format!("{}/{}/predictions", self.jobs_url(), job_id))
            .await?;

        Ok(JobStatus::completed(into_raw_predictions(sources)))
    }
}
