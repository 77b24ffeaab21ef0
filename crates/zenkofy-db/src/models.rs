//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use zenkofy_types::{
    Bookmark, BookmarkId, Document, DocumentId, Note, NoteId, Progress, ReadingStatus,
    Subscription, SubscriptionId, SubscriptionStatus, UserId,
};

use crate::DbError;

/// Document row (`pdfs` table)
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub file_path: String,
    pub file_url: String,
    pub cover_url: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub progress: i32,
    pub last_read: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Note row (`pdf_notes` table)
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub id: Uuid,
    pub pdf_id: Uuid,
    pub user_id: Uuid,
    pub page: Option<i32>,
    pub text: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Bookmark row (`pdf_bookmarks` table)
#[derive(Debug, Clone, FromRow)]
pub struct BookmarkRow {
    pub id: Uuid,
    pub pdf_id: Uuid,
    pub user_id: Uuid,
    pub page: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription row, mirrored from Stripe by the webhook dispatcher
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_id: String,
    pub price_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub currency: Option<String>,
    pub interval: Option<String>,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub amount: Option<i64>,
    pub started_at: Option<i64>,
    pub customer_id: Option<String>,
    pub metadata: serde_json::Value,
    pub canceled_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Webhook log row
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEventRow {
    pub id: Uuid,
    pub event_type: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub stripe_event_id: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let status: ReadingStatus = row
            .status
            .parse()
            .map_err(|e| DbError::InvalidData(format!("pdfs.status: {e}")))?;
        let progress = Progress::new(i64::from(row.progress))
            .map_err(|e| DbError::InvalidData(format!("pdfs.progress: {e}")))?;

        Ok(Document {
            id: DocumentId(row.id),
            user_id: UserId(row.user_id),
            title: row.title,
            author: row.author,
            file_path: row.file_path,
            file_url: row.file_url,
            cover_url: row.cover_url,
            tags: row.tags,
            status,
            progress,
            last_read: row.last_read,
            created_at: row.created_at,
        })
    }
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: NoteId(row.id),
            document_id: DocumentId(row.pdf_id),
            user_id: UserId(row.user_id),
            page: row.page,
            text: row.text,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

impl From<BookmarkRow> for Bookmark {
    fn from(row: BookmarkRow) -> Self {
        Bookmark {
            id: BookmarkId(row.id),
            document_id: DocumentId(row.pdf_id),
            user_id: UserId(row.user_id),
            page: row.page,
            title: row.title,
            created_at: row.created_at,
        }
    }
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: SubscriptionId(row.id),
            user_id: UserId(row.user_id),
            stripe_id: row.stripe_id,
            price_id: row.price_id,
            status: SubscriptionStatus::from(row.status.as_str()),
            interval: row.interval,
            amount: row.amount,
            currency: row.currency,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: row.created_at,
        }
    }
}

/// Convert a list of document rows, failing on the first corrupt row
pub fn documents_from_rows(rows: Vec<DocumentRow>) -> Result<Vec<Document>, DbError> {
    rows.into_iter().map(Document::try_from).collect()
}
