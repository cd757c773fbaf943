//! Scripted collaborators
//!
//! Each fake answers from a queue of scripted results and falls back to a
//! default once the queue is empty. Providers can be gated so a test controls
//! exactly when an in-flight call returns.

use async_trait::async_trait;
use moodlog_common::{AnalysisStatus, Error, Result};
use moodlog_ma::db::InMemoryEntryRepository;
use moodlog_ma::models::{AnalysisPayload, Entry, MoodMetadata, NewEntry};
use moodlog_ma::types::{
    EmotionProvider, EntryRepository, JobState, JobStatus, SentimentProvider,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::happy_mood;

/// Sentiment provider answering from a script
pub struct FakeSentiment {
    responses: Mutex<VecDeque<Result<MoodMetadata>>>,
    fallback: MoodMetadata,
    calls: AtomicU32,
    gate: Option<Arc<Semaphore>>,
}

impl FakeSentiment {
    /// Always answers with `happy_mood()`
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: happy_mood(),
            calls: AtomicU32::new(0),
            gate: None,
        }
    }

    pub fn answering(mood: MoodMetadata) -> Self {
        Self {
            fallback: mood,
            ..Self::new()
        }
    }

    /// Scripted results first, then the fallback mood
    pub fn scripted(responses: Vec<Result<MoodMetadata>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::new()
        }
    }

    /// Every call waits for a permit from `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentProvider for FakeSentiment {
    fn name(&self) -> &'static str {
        "FakeSentiment"
    }

    async fn analyze(&self, _text: &str) -> Result<MoodMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let scripted = self.responses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Emotion provider answering from scripts
///
/// Submissions default to `job-1`, `job-2`, ...; status queries default to
/// IN_PROGRESS.
pub struct FakeEmotion {
    submissions: Mutex<VecDeque<Result<String>>>,
    statuses: Mutex<VecDeque<Result<JobStatus>>>,
    submit_calls: AtomicU32,
    status_calls: AtomicU32,
    gate: Option<Arc<Semaphore>>,
}

impl FakeEmotion {
    pub fn new() -> Self {
        Self {
            submissions: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            submit_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            gate: None,
        }
    }

    pub fn with_submissions(self, submissions: Vec<Result<String>>) -> Self {
        *self.submissions.lock().unwrap() = submissions.into();
        self
    }

    pub fn with_statuses(self, statuses: Vec<Result<JobStatus>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    /// Every submission waits for a permit from `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    /// Queue more status answers
    pub fn push_status(&self, status: Result<JobStatus>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmotionProvider for FakeEmotion {
    fn name(&self) -> &'static str {
        "FakeEmotion"
    }

    async fn submit_job(&self, _media_url: &str) -> Result<String> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let scripted = self.submissions.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("job-{}", n)))
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.statuses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(JobStatus::pending(JobState::InProgress)))
    }
}

/// In-memory repository with switchable failures
pub struct FlakyRepository {
    inner: InMemoryEntryRepository,
    fail_create: AtomicBool,
    fail_updates: AtomicBool,
    failing_updates_left: AtomicU32,
    update_calls: AtomicU32,
    list_calls: AtomicU32,
    list_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FlakyRepository {
    pub fn new(owner_id: &str) -> Self {
        Self {
            inner: InMemoryEntryRepository::new(owner_id),
            fail_create: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            failing_updates_left: AtomicU32::new(0),
            update_calls: AtomicU32::new(0),
            list_calls: AtomicU32::new(0),
            list_gate: Mutex::new(None),
        }
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Fail only the next `count` update attempts
    pub fn fail_next_updates(&self, count: u32) {
        self.failing_updates_left.store(count, Ordering::SeqCst);
    }

    /// `list` takes its snapshot, then waits for a permit from `gate`
    pub fn gate_list(&self, gate: Arc<Semaphore>) {
        *self.list_gate.lock().unwrap() = Some(gate);
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// `update_analysis` + `update_job` attempts, failed ones included
    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub async fn stored(&self, id: Uuid) -> Option<Entry> {
        self.inner.stored(id).await
    }

    fn update_attempt(&self) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let one_off = self
            .failing_updates_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if one_off || self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::Network("repository unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryRepository for FlakyRepository {
    async fn create(&self, entry: NewEntry) -> Result<Entry> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::Server {
                status: 503,
                message: "repository unavailable".to_string(),
            });
        }
        self.inner.create(entry).await
    }

    async fn list(&self) -> Result<Vec<Entry>> {
        let snapshot = self.inner.list().await;
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        snapshot
    }

    async fn update_analysis(
        &self,
        id: Uuid,
        payload: Option<&AnalysisPayload>,
        status: AnalysisStatus,
    ) -> Result<()> {
        self.update_attempt()?;
        self.inner.update_analysis(id, payload, status).await
    }

    async fn update_job(&self, id: Uuid, job_id: Option<&str>) -> Result<()> {
        self.update_attempt()?;
        self.inner.update_job(id, job_id).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.inner.delete(id).await
    }
}
