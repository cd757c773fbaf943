//! Analysis status shared by entry models and events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of the enrichment data attached to an entry
///
/// `PENDING → LOADING → {SUCCESS, ERROR}`. Only `SUCCESS` carries a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    /// Analysis not started yet
    Pending,
    /// Analysis dispatched, result not yet known
    Loading,
    /// Analysis finished with a payload
    Success,
    /// Analysis round ended without a payload
    Error,
}

impl AnalysisStatus {
    /// Check if the status ends an analysis round
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Success | AnalysisStatus::Error)
    }

    /// Stable uppercase name, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "PENDING",
            AnalysisStatus::Loading => "LOADING",
            AnalysisStatus::Success => "SUCCESS",
            AnalysisStatus::Error => "ERROR",
        }
    }

    /// Parse a stored status name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(AnalysisStatus::Pending),
            "LOADING" => Some(AnalysisStatus::Loading),
            "SUCCESS" => Some(AnalysisStatus::Success),
            "ERROR" => Some(AnalysisStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
