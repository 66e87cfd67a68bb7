//! User-submitted spot entries checked for duplicates

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Review status of a stored submission
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    /// Pending and approved entries take part in duplicate detection
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, SubmissionStatus::Pending | SubmissionStatus::Approved)
    }
}

/// A new entry about to be submitted
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubmissionCandidate {
    pub name: String,
    pub prefecture: String,
    #[serde(default)]
    pub coordinates: Option<Coordinate>,
}

impl SubmissionCandidate {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        prefecture: impl Into<String>,
        coordinates: Option<Coordinate>,
    ) -> Self {
        Self {
            name: name.into(),
            prefecture: prefecture.into(),
            coordinates,
        }
    }
}

/// A stored submission, as loaded by the caller
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExistingSubmission {
    pub id: String,
    #[serde(flatten)]
    pub entry: SubmissionCandidate,
    pub status: SubmissionStatus,
}

impl ExistingSubmission {
    #[must_use]
    pub fn new(id: impl Into<String>, entry: SubmissionCandidate, status: SubmissionStatus) -> Self {
        Self {
            id: id.into(),
            entry,
            status,
        }
    }
}
