//! Sentiment provider HTTP client
//!
//! POSTs `{"text": ...}` to the configured endpoint with a bearer API key and
//! expects mood metadata back:
//!
//! ```json
//! {"happiness": 0.8, "sadness": 0.1, "anger": 0.05, "fear": 0.1, "sentiment": "positive"}
//! ```

use async_trait::async_trait;
use moodlog_common::config::SentimentConfig;
use moodlog_common::{Error, Result};
use serde::Serialize;
use std::time::Duration;

use super::http_status::{ensure_success, transport_error};
use crate::models::MoodMetadata;
use crate::types::SentimentProvider;

const PROVIDER: &str = "Sentiment";
const USER_AGENT: &str = concat!("moodlog/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

/// HTTP [`SentimentProvider`]
pub struct HttpSentimentClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSentimentClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &SentimentConfig, api_key: String) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl SentimentProvider for HttpSentimentClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn analyze(&self, text: &str) -> Result<MoodMetadata> {
        tracing::debug!(chars = text.chars().count(), "Querying sentiment provider");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&AnalyzeRequest { text })
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = ensure_success(PROVIDER, response).await?;

        let mood: MoodMetadata = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{} response parse error: {}", PROVIDER, e)))?;

        tracing::info!(
            sentiment = ?mood.sentiment,
            happiness = mood.happiness,
            "Sentiment analysis successful"
        );

        Ok(mood)
    }
}
