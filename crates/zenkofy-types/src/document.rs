//! Document (uploaded PDF) types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DocumentId, UserId, ValidationError};

/// Reading status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadingStatus {
    /// Uploaded but not started
    #[serde(rename = "to-read")]
    ToRead,
    /// Currently being read
    #[serde(rename = "reading")]
    Reading,
    /// Finished
    #[serde(rename = "completed")]
    Completed,
}

impl ReadingStatus {
    /// All statuses, in shelf order
    pub const ALL: [ReadingStatus; 3] = [Self::ToRead, Self::Reading, Self::Completed];

    /// Database / wire representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ToRead => "to-read",
            Self::Reading => "reading",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReadingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to-read" => Ok(Self::ToRead),
            "reading" => Ok(Self::Reading),
            "completed" => Ok(Self::Completed),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

/// Reading progress as a percentage, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    /// Fully read
    pub const COMPLETE: Progress = Progress(100);

    /// Validate a raw percentage
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::ProgressOutOfRange(value))
        }
    }

    /// Percentage value
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Progress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Progress::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Validate a 1-based page number
pub fn validate_page(page: i64) -> Result<i32, ValidationError> {
    if page >= 1 && page <= i64::from(i32::MAX) {
        Ok(page as i32)
    } else {
        Err(ValidationError::InvalidPage(page))
    }
}

/// An uploaded PDF and its reading metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID
    pub id: DocumentId,
    /// Owner
    pub user_id: UserId,
    /// Title
    pub title: String,
    /// Author, if given at upload time
    pub author: Option<String>,
    /// Object path inside the storage bucket
    pub file_path: String,
    /// Public URL of the stored object
    pub file_url: String,
    /// Cover image URL
    pub cover_url: Option<String>,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Reading status
    pub status: ReadingStatus,
    /// Reading progress
    pub progress: Progress,
    /// Last time progress or status changed
    pub last_read: Option<DateTime<Utc>>,
    /// Upload time
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        for status in ReadingStatus::ALL {
            assert_eq!(status.as_str().parse::<ReadingStatus>().unwrap(), status);
        }
        assert!(matches!(
            "done".parse::<ReadingStatus>(),
            Err(ValidationError::InvalidStatus(s)) if s == "done"
        ));
        // Case matters, the database check constraint is exact
        assert!("Reading".parse::<ReadingStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_hyphenated_names() {
        let json = serde_json::to_string(&ReadingStatus::ToRead).unwrap();
        assert_eq!(json, "\"to-read\"");
        let parsed: ReadingStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, ReadingStatus::Completed);
    }

    #[test]
    fn test_progress_bounds() {
        assert_eq!(Progress::new(0).unwrap().value(), 0);
        assert_eq!(Progress::new(100).unwrap(), Progress::COMPLETE);
        assert_eq!(
            Progress::new(101),
            Err(ValidationError::ProgressOutOfRange(101))
        );
        assert!(Progress::new(-1).is_err());
    }

    #[test]
    fn test_progress_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Progress>("42").is_ok());
        assert!(serde_json::from_str::<Progress>("250").is_err());
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(1), Ok(1));
        assert_eq!(validate_page(0), Err(ValidationError::InvalidPage(0)));
        assert!(validate_page(-3).is_err());
        assert!(validate_page(i64::from(i32::MAX) + 1).is_err());
    }
}
