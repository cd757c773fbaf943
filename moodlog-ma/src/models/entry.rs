//! Journal entry model
//!
//! An [`Entry`] is a tagged union over [`EntryKind`]: text entries carry mood
//! metadata, video entries carry emotion data plus the provider job handle.
//! The analysis status state machine is:
//!
//! `PENDING → LOADING → {SUCCESS, ERROR}`
//!
//! `SUCCESS` implies a payload of the entry's kind; every other status implies
//! no payload. [`Entry::apply_analysis`] is the only mutation that touches
//! either, and it preserves that invariant.

use chrono::{DateTime, Utc};
use moodlog_common::events::EntryKindTag;
use moodlog_common::{AnalysisStatus, Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{AnalysisPayload, EmotionData, MoodMetadata};

/// Journal entry (immutable identity, mutable analysis state)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Assigned by the repository
    pub id: Uuid,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: AnalysisStatus,
    pub kind: EntryKind,
}

/// Entry body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    Text(TextEntry),
    Video(VideoEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntry {
    pub content: String,
    pub mood: Option<MoodMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub media_url: String,
    pub thumbnail_url: Option<String>,
    /// Duration in seconds
    pub duration: f64,
    pub emotion: Option<EmotionData>,
    /// Emotion provider job handle, set once submission succeeds
    pub job_id: Option<String>,
}

/// Already-resolvable media reference for a video entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_url: String,
    pub thumbnail_url: Option<String>,
}

impl MediaRef {
    pub fn new(media_url: impl Into<String>) -> Self {
        Self {
            media_url: media_url.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }
}

/// Validated creation request handed to the repository
#[derive(Debug, Clone, PartialEq)]
pub enum NewEntry {
    Text {
        content: String,
    },
    Video {
        media: MediaRef,
        duration: f64,
    },
}

impl NewEntry {
    /// Build a text entry request; empty or whitespace-only content is rejected
    pub fn text(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::Validation(
                "Entry content must not be empty".to_string(),
            ));
        }
        Ok(NewEntry::Text { content })
    }

    /// Build a video entry request; media URL must be non-empty and duration a
    /// finite, non-negative number of seconds
    pub fn video(media: MediaRef, duration: f64) -> Result<Self> {
        if media.media_url.trim().is_empty() {
            return Err(Error::Validation(
                "Video media URL must not be empty".to_string(),
            ));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::Validation(format!(
                "Video duration must be a non-negative number of seconds, got {}",
                duration
            )));
        }
        Ok(NewEntry::Video { media, duration })
    }

    pub fn kind_tag(&self) -> EntryKindTag {
        match self {
            NewEntry::Text { .. } => EntryKindTag::Text,
            NewEntry::Video { .. } => EntryKindTag::Video,
        }
    }

    /// Materialize the entry as the repository stores it (status PENDING)
    pub fn into_entry(self, id: Uuid, owner_id: String, now: DateTime<Utc>) -> Entry {
        let kind = match self {
            NewEntry::Text { content } => EntryKind::Text(TextEntry {
                content,
                mood: None,
            }),
            NewEntry::Video { media, duration } => EntryKind::Video(VideoEntry {
                media_url: media.media_url,
                thumbnail_url: media.thumbnail_url,
                duration,
                emotion: None,
                job_id: None,
            }),
        };

        Entry {
            id,
            owner_id,
            created_at: now,
            updated_at: now,
            status: AnalysisStatus::Pending,
            kind,
        }
    }
}

impl Entry {
    pub fn kind_tag(&self) -> EntryKindTag {
        match self.kind {
            EntryKind::Text(_) => EntryKindTag::Text,
            EntryKind::Video(_) => EntryKindTag::Video,
        }
    }

    /// Current analysis payload, if any
    pub fn payload(&self) -> Option<AnalysisPayload> {
        match &self.kind {
            EntryKind::Text(text) => text.mood.clone().map(AnalysisPayload::Mood),
            EntryKind::Video(video) => video.emotion.clone().map(AnalysisPayload::Emotion),
        }
    }

    /// Video job handle, if this is a video entry with a submitted job
    pub fn job_id(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Video(video) => video.job_id.as_deref(),
            EntryKind::Text(_) => None,
        }
    }

    /// Check that a (payload, status) pair is admissible for this entry
    pub fn check_analysis(
        &self,
        payload: Option<&AnalysisPayload>,
        status: AnalysisStatus,
    ) -> Result<()> {
        match (status, payload, &self.kind) {
            (AnalysisStatus::Success, Some(AnalysisPayload::Mood(mood)), EntryKind::Text(_)) => {
                if mood.is_well_formed() {
                    Ok(())
                } else {
                    Err(Error::InvalidInput(format!(
                        "Mood scores out of [0, 1] for entry {}",
                        self.id
                    )))
                }
            }
            (AnalysisStatus::Success, Some(AnalysisPayload::Emotion(_)), EntryKind::Video(_)) => {
                Ok(())
            }
            (AnalysisStatus::Success, Some(_), _) => Err(Error::InvalidInput(format!(
                "Payload kind does not match {:?} entry {}",
                self.kind_tag(),
                self.id
            ))),
            (AnalysisStatus::Success, None, _) => Err(Error::InvalidInput(format!(
                "SUCCESS requires a payload for entry {}",
                self.id
            ))),
            (_, Some(_), _) => Err(Error::InvalidInput(format!(
                "{} must not carry a payload for entry {}",
                status, self.id
            ))),
            (_, None, _) => Ok(()),
        }
    }

    /// Apply an analysis result
    ///
    /// Returns `Ok(false)` when the entry already holds exactly this state, so
    /// re-applying a result is a no-op. Non-SUCCESS statuses clear the payload.
    pub fn apply_analysis(
        &mut self,
        payload: Option<AnalysisPayload>,
        status: AnalysisStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.check_analysis(payload.as_ref(), status)?;

        if self.status == status && self.payload() == payload {
            return Ok(false);
        }

        match (&mut self.kind, payload) {
            (EntryKind::Text(text), Some(AnalysisPayload::Mood(mood))) => text.mood = Some(mood),
            (EntryKind::Video(video), Some(AnalysisPayload::Emotion(emotion))) => {
                video.emotion = Some(emotion)
            }
            (EntryKind::Text(text), _) => text.mood = None,
            (EntryKind::Video(video), _) => video.emotion = None,
        }
        self.status = status;
        self.updated_at = now;
        Ok(true)
    }

    /// Status a freshly loaded entry should display
    ///
    /// The repository persists payloads and job handles but not in-flight
    /// state: a stored payload means SUCCESS, a video with a job but no payload
    /// is still awaiting reconciliation, anything else ended without a result.
    pub fn derive_loaded_status(&self) -> AnalysisStatus {
        match &self.kind {
            EntryKind::Text(text) if text.mood.is_some() => AnalysisStatus::Success,
            EntryKind::Video(video) if video.emotion.is_some() => AnalysisStatus::Success,
            EntryKind::Video(video) if video.job_id.is_some() => AnalysisStatus::Loading,
            _ => AnalysisStatus::Error,
        }
    }
}
