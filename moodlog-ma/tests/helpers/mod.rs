//! Test Helper Utilities
//!
//! Shared utilities for testing moodlog-ma

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;

pub use db_utils::create_test_db;
pub use fakes::{FakeEmotion, FakeSentiment, FlakyRepository};

use moodlog_common::events::EventBus;
use moodlog_common::AnalysisStatus;
use moodlog_ma::models::{EmotionScore, MoodMetadata, Sentiment};
use moodlog_ma::types::{EmotionProvider, EntryRepository, SentimentProvider};
use moodlog_ma::{EntryStore, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Two attempts with a 1 ms backoff
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(1), 2.0)
}

pub fn build_store(
    repository: Arc<dyn EntryRepository>,
    sentiment: Arc<dyn SentimentProvider>,
    emotion: Arc<dyn EmotionProvider>,
) -> EntryStore {
    EntryStore::new(repository, sentiment, emotion, fast_retry(), EventBus::new(64))
}

pub fn happy_mood() -> MoodMetadata {
    MoodMetadata {
        happiness: 0.8,
        sadness: 0.1,
        anger: 0.05,
        fear: 0.1,
        sentiment: Sentiment::Positive,
    }
}

pub fn face_emotions() -> Vec<EmotionScore> {
    vec![
        EmotionScore::new("Joy", 0.62),
        EmotionScore::new("Calmness", 0.21),
        EmotionScore::new("Surprise (positive)", 0.08),
    ]
}

/// Poll until the entry reaches `status` or a second passes
pub async fn wait_for_status(store: &EntryStore, id: Uuid, status: AnalysisStatus) -> bool {
    for _ in 0..100 {
        if store.get(id).await.map(|e| e.status) == Some(status) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
