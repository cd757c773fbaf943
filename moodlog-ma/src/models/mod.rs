//! Data models for moodlog-ma (mood analysis)
//!
//! - Journal entries and their analysis status state machine
//! - Analysis payloads (text mood metadata, video emotion data)

pub mod analysis;
pub mod entry;

pub use analysis::{AnalysisPayload, EmotionData, EmotionScore, Modality, MoodMetadata, Sentiment};
pub use entry::{Entry, EntryKind, MediaRef, NewEntry, TextEntry, VideoEntry};
pub use moodlog_common::AnalysisStatus;
