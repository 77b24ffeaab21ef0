//! Zenkofy DB - Database abstractions
//!
//! SQLx-based database layer for Zenkofy services. Every user-facing query
//! is scoped by the owning user's id; the repositories never expose an
//! unscoped read or write of documents, notes or bookmarks.
//!
//! # Example
//!
//! ```rust,ignore
//! use zenkofy_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/zenkofy", Default::default()).await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::postgres(pool);
//!
//! let shelf = repos.documents.list(user_id, &DocumentFilter::default()).await?;
//! ```

pub mod error;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pool::{create_pool, run_migrations, DbPool, PoolOptions};
pub use repo::*;

/// All repositories bundled together behind trait objects
#[derive(Clone)]
pub struct Repositories {
    pub documents: Arc<dyn DocumentRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub bookmarks: Arc<dyn BookmarkRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub users: Arc<dyn UserRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    /// Create all repositories from a Postgres pool
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            documents: Arc::new(pg::PgDocumentRepository::new(pool.clone())),
            notes: Arc::new(pg::PgNoteRepository::new(pool.clone())),
            bookmarks: Arc::new(pg::PgBookmarkRepository::new(pool.clone())),
            subscriptions: Arc::new(pg::PgSubscriptionRepository::new(pool.clone())),
            webhook_events: Arc::new(pg::PgWebhookEventRepository::new(pool.clone())),
            users: Arc::new(pg::PgUserRepository::new(pool.clone())),
            health: Arc::new(pg::PgHealthCheck::new(pool)),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
