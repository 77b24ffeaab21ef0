//! Reading analytics computed from a user's shelf

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Document, DocumentId, ReadingStatus};

/// How many recently read documents the summary lists
pub const RECENT_ACTIVITY_LEN: usize = 5;

/// Per-user reading summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingStats {
    pub total_documents: usize,
    pub to_read: usize,
    pub reading: usize,
    pub completed: usize,
    /// Mean progress across all documents, rounded to one decimal
    pub average_progress: f64,
    /// Completed documents as a percentage of all documents
    pub completion_rate: f64,
    pub unique_tags: usize,
    pub recent_activity: Vec<RecentRead>,
}

/// One entry of the recent-activity list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentRead {
    pub id: DocumentId,
    pub title: String,
    pub progress: u8,
    pub status: ReadingStatus,
    pub last_read: DateTime<Utc>,
}

impl ReadingStats {
    /// Summarize a set of documents belonging to one user
    pub fn from_documents(documents: &[Document]) -> Self {
        let total = documents.len();
        let count = |status: ReadingStatus| documents.iter().filter(|d| d.status == status).count();
        let completed = count(ReadingStatus::Completed);

        let (average_progress, completion_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            let sum: u64 = documents.iter().map(|d| u64::from(d.progress.value())).sum();
            (
                round1(sum as f64 / total as f64),
                round1(completed as f64 * 100.0 / total as f64),
            )
        };

        let unique_tags = documents
            .iter()
            .flat_map(|d| d.tags.iter().map(String::as_str))
            .collect::<HashSet<_>>()
            .len();

        let mut recent: Vec<RecentRead> = documents
            .iter()
            .filter_map(|d| {
                d.last_read.map(|last_read| RecentRead {
                    id: d.id,
                    title: d.title.clone(),
                    progress: d.progress.value(),
                    status: d.status,
                    last_read,
                })
            })
            .collect();
        recent.sort_by(|a, b| b.last_read.cmp(&a.last_read));
        recent.truncate(RECENT_ACTIVITY_LEN);

        Self {
            total_documents: total,
            to_read: count(ReadingStatus::ToRead),
            reading: count(ReadingStatus::Reading),
            completed,
            average_progress,
            completion_rate,
            unique_tags,
            recent_activity: recent,
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
