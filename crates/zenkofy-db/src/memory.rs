//! In-memory repositories
//!
//! DashMap-backed implementations of every repository trait, used by the
//! service test suites and for running the API without a database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::*;
use crate::repo::*;
use crate::Repositories;

/// In-memory document repository
#[derive(Default, Clone)]
pub struct MemoryDocumentRepository {
    rows: Arc<DashMap<Uuid, DocumentRow>>,
    fail_inserts: Arc<AtomicBool>,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail with a database error
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn list(&self, user_id: Uuid, filter: &DocumentFilter) -> DbResult<Vec<DocumentRow>> {
        let mut docs: Vec<DocumentRow> = self
            .rows
            .iter()
            .filter(|r| r.user_id == user_id && filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn find(&self, user_id: Uuid, id: Uuid) -> DbResult<Option<DocumentRow>> {
        Ok(self
            .rows
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone()))
    }

    async fn create(&self, doc: CreateDocument) -> DbResult<DocumentRow> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
        }
        if self.rows.contains_key(&doc.id) {
            return Err(DbError::Conflict("pdfs".to_string()));
        }
        let row = DocumentRow {
            id: doc.id,
            user_id: doc.user_id,
            title: doc.title,
            author: doc.author,
            file_path: doc.file_path,
            file_url: doc.file_url,
            cover_url: doc.cover_url,
            tags: doc.tags,
            status: "to-read".to_string(),
            progress: 0,
            last_read: None,
            created_at: Utc::now(),
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: UpdateDocument,
    ) -> DbResult<Option<DocumentRow>> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        if row.user_id != user_id {
            return Ok(None);
        }
        if let Some(status) = update.status {
            row.status = status.as_str().to_string();
        }
        if let Some(progress) = update.progress {
            row.progress = i32::from(progress.value());
        }
        if let Some(tags) = update.tags {
            row.tags = tags;
        }
        if let Some(last_read) = update.last_read {
            row.last_read = Some(last_read);
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> DbResult<bool> {
        Ok(self
            .rows
            .remove_if(&id, |_, r| r.user_id == user_id)
            .is_some())
    }
}

/// In-memory note repository
#[derive(Default, Clone)]
pub struct MemoryNoteRepository {
    rows: Arc<DashMap<Uuid, NoteRow>>,
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn list(&self, user_id: Uuid, pdf_id: Uuid) -> DbResult<Vec<NoteRow>> {
        let mut notes: Vec<NoteRow> = self
            .rows
            .iter()
            .filter(|r| r.user_id == user_id && r.pdf_id == pdf_id)
            .map(|r| r.value().clone())
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn create(&self, note: CreateNote) -> DbResult<NoteRow> {
        let row = NoteRow {
            id: note.id,
            pdf_id: note.pdf_id,
            user_id: note.user_id,
            page: note.page,
            text: note.text,
            color: note.color,
            created_at: Utc::now(),
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, pdf_id: Uuid, id: Uuid) -> DbResult<bool> {
        Ok(self
            .rows
            .remove_if(&id, |_, r| r.user_id == user_id && r.pdf_id == pdf_id)
            .is_some())
    }
}

/// In-memory bookmark repository
#[derive(Default, Clone)]
pub struct MemoryBookmarkRepository {
    rows: Arc<DashMap<Uuid, BookmarkRow>>,
}

#[async_trait]
impl BookmarkRepository for MemoryBookmarkRepository {
    async fn list(&self, user_id: Uuid, pdf_id: Uuid) -> DbResult<Vec<BookmarkRow>> {
        let mut bookmarks: Vec<BookmarkRow> = self
            .rows
            .iter()
            .filter(|r| r.user_id == user_id && r.pdf_id == pdf_id)
            .map(|r| r.value().clone())
            .collect();
        bookmarks.sort_by_key(|b| b.page);
        Ok(bookmarks)
    }

    async fn find_by_page(
        &self,
        user_id: Uuid,
        pdf_id: Uuid,
        page: i32,
    ) -> DbResult<Option<BookmarkRow>> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.user_id == user_id && r.pdf_id == pdf_id && r.page == page)
            .map(|r| r.value().clone()))
    }

    async fn create(&self, bookmark: CreateBookmark) -> DbResult<BookmarkRow> {
        if self
            .find_by_page(bookmark.user_id, bookmark.pdf_id, bookmark.page)
            .await?
            .is_some()
        {
            return Err(DbError::Conflict(
                "bookmark already exists for this page".to_string(),
            ));
        }
        let row = BookmarkRow {
            id: bookmark.id,
            pdf_id: bookmark.pdf_id,
            user_id: bookmark.user_id,
            page: bookmark.page,
            title: bookmark.title,
            created_at: Utc::now(),
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, pdf_id: Uuid, id: Uuid) -> DbResult<bool> {
        Ok(self
            .rows
            .remove_if(&id, |_, r| r.user_id == user_id && r.pdf_id == pdf_id)
            .is_some())
    }
}

/// In-memory subscription repository, keyed by Stripe subscription id
#[derive(Default, Clone)]
pub struct MemorySubscriptionRepository {
    rows: Arc<DashMap<String, SubscriptionRow>>,
}

impl MemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepository {
    async fn find_active_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.user_id == user_id && matches!(r.status.as_str(), "active" | "trialing"))
            .max_by_key(|r| r.created_at)
            .map(|r| r.value().clone()))
    }

    async fn find_by_stripe_id(&self, stripe_id: &str) -> DbResult<Option<SubscriptionRow>> {
        Ok(self.rows.get(stripe_id).map(|r| r.value().clone()))
    }

    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<SubscriptionRow> {
        let now = Utc::now();
        let mut entry = self
            .rows
            .entry(sub.stripe_id.clone())
            .or_insert_with(|| SubscriptionRow {
                id: Uuid::new_v4(),
                user_id: sub.user_id,
                stripe_id: sub.stripe_id.clone(),
                price_id: None,
                stripe_price_id: None,
                currency: None,
                interval: None,
                status: sub.status.clone(),
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
                amount: None,
                started_at: None,
                customer_id: None,
                metadata: serde_json::Value::Object(Default::default()),
                canceled_at: None,
                ended_at: None,
                created_at: now,
                updated_at: now,
            });
        let row = entry.value_mut();
        row.user_id = sub.user_id;
        row.price_id = sub.price_id.clone();
        row.stripe_price_id = sub.price_id;
        row.currency = sub.currency;
        row.interval = sub.interval;
        row.status = sub.status;
        row.current_period_start = sub.current_period_start;
        row.current_period_end = sub.current_period_end;
        row.cancel_at_period_end = sub.cancel_at_period_end;
        row.amount = sub.amount;
        row.started_at = sub.started_at;
        row.customer_id = sub.customer_id;
        row.metadata = sub.metadata;
        row.canceled_at = sub.canceled_at;
        row.ended_at = sub.ended_at;
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn apply_update(&self, stripe_id: &str, update: SubscriptionUpdate) -> DbResult<bool> {
        let Some(mut row) = self.rows.get_mut(stripe_id) else {
            return Ok(false);
        };
        if let Some(user_id) = update.user_id {
            row.user_id = user_id;
        }
        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(start) = update.current_period_start {
            row.current_period_start = Some(start);
        }
        if let Some(end) = update.current_period_end {
            row.current_period_end = Some(end);
        }
        if let Some(cancel) = update.cancel_at_period_end {
            row.cancel_at_period_end = cancel;
        }
        if let Some(metadata) = update.metadata {
            row.metadata = metadata;
        }
        if update.mirror_end_dates {
            row.canceled_at = update.canceled_at;
            row.ended_at = update.ended_at;
        }
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_status(&self, stripe_id: &str, status: &str) -> DbResult<bool> {
        let Some(mut row) = self.rows.get_mut(stripe_id) else {
            return Ok(false);
        };
        row.status = status.to_string();
        row.updated_at = Utc::now();
        Ok(true)
    }
}

/// In-memory webhook event log, keyed by `(stripe_event_id, kind)`
#[derive(Default, Clone)]
pub struct MemoryWebhookEventRepository {
    rows: Arc<DashMap<(String, String), WebhookEventRow>>,
}

impl MemoryWebhookEventRepository {
    /// Logged records for an event id, oldest first
    pub fn events_for(&self, stripe_event_id: &str) -> Vec<WebhookEventRow> {
        let mut rows: Vec<WebhookEventRow> = self
            .rows
            .iter()
            .filter(|r| r.stripe_event_id == stripe_event_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl WebhookEventRepository for MemoryWebhookEventRepository {
    async fn record(&self, event: NewWebhookEvent) -> DbResult<bool> {
        let key = (event.stripe_event_id.clone(), event.kind.clone());
        let now = Utc::now();
        if let Some(mut existing) = self.rows.get_mut(&key) {
            existing.event_type = event.event_type;
            existing.data = event.data;
            existing.modified_at = now;
            return Ok(false);
        }
        self.rows.insert(
            key,
            WebhookEventRow {
                id: Uuid::new_v4(),
                event_type: event.event_type,
                kind: event.kind,
                stripe_event_id: event.stripe_event_id,
                data: event.data,
                created_at: event.created_at,
                modified_at: now,
            },
        );
        Ok(true)
    }
}

/// In-memory user mirror
#[derive(Default, Clone)]
pub struct MemoryUserRepository {
    by_email: Arc<DashMap<String, (Uuid, Option<String>)>>,
}

impl MemoryUserRepository {
    /// Insert a test user directly
    pub fn insert_user(&self, id: Uuid, email: &str, subscription: Option<&str>) {
        self.by_email
            .insert(email.to_string(), (id, subscription.map(str::to_string)));
    }

    /// Current subscription marker for an email
    pub fn subscription_of(&self, email: &str) -> Option<String> {
        self.by_email.get(email).and_then(|r| r.value().1.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_id_by_email(&self, email: &str) -> DbResult<Option<Uuid>> {
        Ok(self.by_email.get(email).map(|r| r.value().0))
    }

    async fn clear_subscription_by_email(&self, email: &str) -> DbResult<u64> {
        match self.by_email.get_mut(email) {
            Some(mut entry) => {
                entry.value_mut().1 = None;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// Health probe that can be switched off
#[derive(Default, Clone)]
pub struct MemoryHealthCheck {
    down: Arc<AtomicBool>,
}

impl MemoryHealthCheck {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthCheck for MemoryHealthCheck {
    async fn ping(&self) -> DbResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

/// Concrete handles to the in-memory repositories, for seeding and inspection
#[derive(Default, Clone)]
pub struct MemoryRepositories {
    pub documents: MemoryDocumentRepository,
    pub notes: MemoryNoteRepository,
    pub bookmarks: MemoryBookmarkRepository,
    pub subscriptions: MemorySubscriptionRepository,
    pub webhook_events: MemoryWebhookEventRepository,
    pub users: MemoryUserRepository,
    pub health: MemoryHealthCheck,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type-erased view sharing the same underlying maps
    pub fn repositories(&self) -> Repositories {
        Repositories {
            documents: Arc::new(self.documents.clone()),
            notes: Arc::new(self.notes.clone()),
            bookmarks: Arc::new(self.bookmarks.clone()),
            subscriptions: Arc::new(self.subscriptions.clone()),
            webhook_events: Arc::new(self.webhook_events.clone()),
            users: Arc::new(self.users.clone()),
            health: Arc::new(self.health.clone()),
        }
    }
}

impl Repositories {
    /// Fresh in-memory repositories
    pub fn in_memory() -> Self {
        MemoryRepositories::new().repositories()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zenkofy_types::{Progress, ReadingStatus};

    fn new_doc(user_id: Uuid, title: &str, tags: &[&str]) -> CreateDocument {
        let id = Uuid::new_v4();
        CreateDocument {
            id,
            user_id,
            title: title.to_string(),
            author: Some("Ada Lovelace".to_string()),
            file_path: format!("{user_id}/{id}.pdf"),
            file_url: format!("https://files.test/{id}.pdf"),
            cover_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_documents_are_scoped_to_owner() {
        let repo = MemoryDocumentRepository::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let doc = repo.create(new_doc(alice, "Notes", &[])).await.unwrap();

        assert!(repo.find(bob, doc.id).await.unwrap().is_none());
        assert!(repo.list(bob, &DocumentFilter::default()).await.unwrap().is_empty());

        let update = UpdateDocument {
            progress: Some(Progress::new(40).unwrap()),
            ..Default::default()
        };
        assert!(repo.update(bob, doc.id, update.clone()).await.unwrap().is_none());
        assert!(!repo.delete(bob, doc.id).await.unwrap());

        let updated = repo.update(alice, doc.id, update).await.unwrap().unwrap();
        assert_eq!(updated.progress, 40);
        assert_eq!(updated.status, "to-read");
        assert!(repo.delete(alice, doc.id).await.unwrap());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_document_filters() {
        let repo = MemoryDocumentRepository::new();
        let user = Uuid::new_v4();
        let a = repo.create(new_doc(user, "Rust in Action", &["rust"])).await.unwrap();
        repo.create(new_doc(user, "Go Programming", &["go"])).await.unwrap();
        repo.update(
            user,
            a.id,
            UpdateDocument {
                status: Some(ReadingStatus::Reading),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let by_search = DocumentFilter {
            search: Some("RUST".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list(user, &by_search).await.unwrap().len(), 1);

        let by_tag = DocumentFilter {
            tag: Some("go".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list(user, &by_tag).await.unwrap()[0].title, "Go Programming");

        let by_status = DocumentFilter {
            status: Some(ReadingStatus::Reading),
            ..Default::default()
        };
        assert_eq!(repo.list(user, &by_status).await.unwrap()[0].id, a.id);

        let by_author = DocumentFilter {
            search: Some("lovelace".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list(user, &by_author).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fail_inserts_toggle() {
        let repo = MemoryDocumentRepository::new();
        repo.fail_inserts(true);
        let err = repo.create(new_doc(Uuid::new_v4(), "x", &[])).await.unwrap_err();
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[tokio::test]
    async fn test_bookmark_page_is_unique_per_owner() {
        let repo = MemoryBookmarkRepository::default();
        let pdf_id = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let bookmark = |user_id| CreateBookmark {
            id: Uuid::new_v4(),
            pdf_id,
            user_id,
            page: 7,
            title: "Page 7".to_string(),
        };

        repo.create(bookmark(alice)).await.unwrap();
        let err = repo.create(bookmark(alice)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        repo.create(bookmark(bob)).await.unwrap();
    }

    #[tokio::test]
    async fn test_bookmarks_listed_by_page() {
        let repo = MemoryBookmarkRepository::default();
        let pdf_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        for page in [9, 2, 5] {
            repo.create(CreateBookmark {
                id: Uuid::new_v4(),
                pdf_id,
                user_id,
                page,
                title: format!("Page {page}"),
            })
            .await
            .unwrap();
        }
        let pages: Vec<i32> = repo
            .list(user_id, pdf_id)
            .await
            .unwrap()
            .iter()
            .map(|b| b.page)
            .collect();
        assert_eq!(pages, vec![2, 5, 9]);
    }

    #[tokio::test]
    async fn test_webhook_record_is_idempotent() {
        let repo = MemoryWebhookEventRepository::default();
        let event = NewWebhookEvent {
            event_type: "customer.subscription.created".to_string(),
            kind: "customer.subscription.created".to_string(),
            stripe_event_id: "evt_1".to_string(),
            data: serde_json::json!({"n": 1}),
            created_at: Utc::now(),
        };
        assert!(repo.record(event.clone()).await.unwrap());
        assert!(!repo.record(event.clone()).await.unwrap());

        let outcome = NewWebhookEvent {
            kind: "invoice_payment".to_string(),
            ..event
        };
        assert!(repo.record(outcome).await.unwrap());
        assert_eq!(repo.events_for("evt_1").len(), 2);
    }

    #[tokio::test]
    async fn test_subscription_upsert_replaces_by_stripe_id() {
        let repo = MemorySubscriptionRepository::new();
        let user_id = Uuid::new_v4();
        let sub = UpsertSubscription {
            user_id,
            stripe_id: "sub_1".to_string(),
            price_id: Some("price_1".to_string()),
            currency: Some("usd".to_string()),
            interval: Some("month".to_string()),
            status: "incomplete".to_string(),
            current_period_start: Some(1),
            current_period_end: Some(2),
            cancel_at_period_end: false,
            amount: Some(999),
            started_at: Some(1),
            customer_id: Some("cus_1".to_string()),
            metadata: serde_json::json!({}),
            canceled_at: None,
            ended_at: None,
        };
        let first = repo.upsert(sub.clone()).await.unwrap();
        let second = repo
            .upsert(UpsertSubscription {
                status: "active".to_string(),
                ..sub
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            repo.find_active_by_user_id(user_id).await.unwrap().unwrap().stripe_id,
            "sub_1"
        );
        assert!(repo.update_status("sub_1", "past_due").await.unwrap());
        assert!(repo.find_active_by_user_id(user_id).await.unwrap().is_none());
        assert!(!repo.update_status("sub_missing", "canceled").await.unwrap());
    }
}
