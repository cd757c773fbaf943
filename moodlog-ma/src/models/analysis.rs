//! Analysis payloads attached to journal entries
//!
//! Text entries carry [`MoodMetadata`] from the sentiment provider; video entries
//! carry [`EmotionData`] extracted from the emotion provider's job predictions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall sentiment category of a text entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

/// Mood scores for a text entry, each in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodMetadata {
    pub happiness: f64,
    pub sadness: f64,
    pub anger: f64,
    pub fear: f64,
    pub sentiment: Sentiment,
}

impl MoodMetadata {
    /// Check every score lies in [0, 1]
    pub fn is_well_formed(&self) -> bool {
        [self.happiness, self.sadness, self.anger, self.fear]
            .iter()
            .all(|score| (0.0..=1.0).contains(score))
    }
}

/// One named emotion score as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub name: String,
    pub score: f64,
}

impl EmotionScore {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Recognized analysis modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Facial expression
    Face,
    /// Vocal tone
    Prosody,
    /// Spoken language content
    Language,
    /// Vocal bursts (laughs, sighs)
    Burst,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Face,
        Modality::Prosody,
        Modality::Language,
        Modality::Burst,
    ];

    /// Wire name used by the emotion provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Prosody => "prosody",
            Modality::Language => "language",
            Modality::Burst => "burst",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }
}

/// Emotion scores for a video entry, keyed by modality
///
/// Scores are stored verbatim in provider order; a modality the provider did
/// not report is absent rather than defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionData {
    modalities: BTreeMap<Modality, Vec<EmotionScore>>,
}

impl EmotionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, modality: Modality, scores: Vec<EmotionScore>) {
        self.modalities.insert(modality, scores);
    }

    pub fn get(&self, modality: Modality) -> Option<&[EmotionScore]> {
        self.modalities.get(&modality).map(Vec::as_slice)
    }

    pub fn contains(&self, modality: Modality) -> bool {
        self.modalities.contains_key(&modality)
    }

    pub fn modalities(&self) -> impl Iterator<Item = Modality> + '_ {
        self.modalities.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.modalities.is_empty()
    }

    /// Highest scoring emotion within a modality
    pub fn dominant(&self, modality: Modality) -> Option<&EmotionScore> {
        self.get(modality)?
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Payload produced by one successful analysis round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum AnalysisPayload {
    Mood(MoodMetadata),
    Emotion(EmotionData),
}
