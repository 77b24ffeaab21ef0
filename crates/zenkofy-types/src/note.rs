//! Notes and bookmarks attached to a document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BookmarkId, DocumentId, NoteId, UserId};

/// Highlight color used when the client does not pick one
pub const DEFAULT_NOTE_COLOR: &str = "yellow";

/// A note taken while reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(rename = "pdf_id")]
    pub document_id: DocumentId,
    pub user_id: UserId,
    pub page: Option<i32>,
    pub text: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// A bookmarked page. At most one per (document, owner, page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    #[serde(rename = "pdf_id")]
    pub document_id: DocumentId,
    pub user_id: UserId,
    pub page: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Title given to a bookmark created without one
pub fn default_bookmark_title(page: i32) -> String {
    format!("Page {page}")
}
