//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use zenkofy_types::{Progress, ReadingStatus};

use crate::error::DbResult;
use crate::models::*;

/// Filters accepted when listing a user's documents
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Only documents with this status
    pub status: Option<ReadingStatus>,
    /// Case-insensitive substring matched against title or author
    pub search: Option<String>,
    /// Only documents carrying this tag
    pub tag: Option<String>,
}

impl DocumentFilter {
    /// In-process evaluation of the filter, matching the SQL semantics
    pub fn matches(&self, row: &DocumentRow) -> bool {
        if let Some(status) = self.status {
            if row.status != status.as_str() {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = row.title.to_lowercase().contains(&needle);
            let in_author = row
                .author
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&needle));
            if !in_title && !in_author {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !row.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}

/// Document repository trait
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// List a user's documents, newest first
    async fn list(&self, user_id: Uuid, filter: &DocumentFilter) -> DbResult<Vec<DocumentRow>>;

    /// Find one of the user's documents
    async fn find(&self, user_id: Uuid, id: Uuid) -> DbResult<Option<DocumentRow>>;

    /// Insert a new document
    async fn create(&self, doc: CreateDocument) -> DbResult<DocumentRow>;

    /// Apply a partial update to one of the user's documents.
    /// Returns `None` when the user owns no such document.
    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: UpdateDocument,
    ) -> DbResult<Option<DocumentRow>>;

    /// Delete one of the user's documents. Returns whether a row was removed.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> DbResult<bool>;
}

/// Create document input
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub file_path: String,
    pub file_url: String,
    pub cover_url: Option<String>,
    pub tags: Vec<String>,
}

/// Partial document update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateDocument {
    pub status: Option<ReadingStatus>,
    pub progress: Option<Progress>,
    pub tags: Option<Vec<String>>,
    pub last_read: Option<DateTime<Utc>>,
}

impl UpdateDocument {
    /// Whether the update would change nothing
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.tags.is_none()
            && self.last_read.is_none()
    }
}

/// Note repository trait
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List the user's notes on a document, newest first
    async fn list(&self, user_id: Uuid, pdf_id: Uuid) -> DbResult<Vec<NoteRow>>;

    /// Insert a new note
    async fn create(&self, note: CreateNote) -> DbResult<NoteRow>;

    /// Delete one of the user's notes on a document
    async fn delete(&self, user_id: Uuid, pdf_id: Uuid, id: Uuid) -> DbResult<bool>;
}

/// Create note input
#[derive(Debug, Clone)]
pub struct CreateNote {
    pub id: Uuid,
    pub pdf_id: Uuid,
    pub user_id: Uuid,
    pub page: Option<i32>,
    pub text: String,
    pub color: String,
}

/// Bookmark repository trait
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// List the user's bookmarks on a document, by page ascending
    async fn list(&self, user_id: Uuid, pdf_id: Uuid) -> DbResult<Vec<BookmarkRow>>;

    /// Find the user's bookmark on a given page
    async fn find_by_page(
        &self,
        user_id: Uuid,
        pdf_id: Uuid,
        page: i32,
    ) -> DbResult<Option<BookmarkRow>>;

    /// Insert a new bookmark; [`crate::DbError::Conflict`] if the page is taken
    async fn create(&self, bookmark: CreateBookmark) -> DbResult<BookmarkRow>;

    /// Delete one of the user's bookmarks on a document
    async fn delete(&self, user_id: Uuid, pdf_id: Uuid, id: Uuid) -> DbResult<bool>;
}

/// Create bookmark input
#[derive(Debug, Clone)]
pub struct CreateBookmark {
    pub id: Uuid,
    pub pdf_id: Uuid,
    pub user_id: Uuid,
    pub page: i32,
    pub title: String,
}

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Latest active or trialing subscription for a user
    async fn find_active_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Find subscription by Stripe subscription ID
    async fn find_by_stripe_id(&self, stripe_id: &str) -> DbResult<Option<SubscriptionRow>>;

    /// Insert or fully replace the subscription keyed by `stripe_id`
    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<SubscriptionRow>;

    /// Apply provider-side changes. Returns whether a row matched.
    async fn apply_update(&self, stripe_id: &str, update: SubscriptionUpdate) -> DbResult<bool>;

    /// Set status only. Returns whether a row matched.
    async fn update_status(&self, stripe_id: &str, status: &str) -> DbResult<bool>;
}

/// Full subscription record as received from the provider
#[derive(Debug, Clone)]
pub struct UpsertSubscription {
    pub user_id: Uuid,
    pub stripe_id: String,
    pub price_id: Option<String>,
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
}

/// Mutable subscription fields. `None` leaves a column untouched except for
/// `canceled_at` / `ended_at`, which mirror the provider value verbatim.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: Option<bool>,
    pub metadata: Option<serde_json::Value>,
    pub canceled_at: Option<i64>,
    pub ended_at: Option<i64>,
    /// Whether `canceled_at` / `ended_at` are part of this update
    pub mirror_end_dates: bool,
}

/// Webhook event log trait
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Upsert a log record keyed by `(stripe_event_id, kind)`.
    /// Returns `true` when the record was newly inserted.
    async fn record(&self, event: NewWebhookEvent) -> DbResult<bool>;
}

/// Webhook log input
#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub event_type: String,
    pub kind: String,
    pub stripe_event_id: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Users mirrored from the auth provider
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Resolve a user id from an email address
    async fn find_id_by_email(&self, email: &str) -> DbResult<Option<Uuid>>;

    /// Clear the subscription marker on users with this email
    async fn clear_subscription_by_email(&self, email: &str) -> DbResult<u64>;
}

/// Connectivity probe
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> DbResult<()>;
}
