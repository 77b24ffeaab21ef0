//! PostgreSQL bookmark repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::BookmarkRow;
use crate::repo::{BookmarkRepository, CreateBookmark};

/// PostgreSQL bookmark repository
#[derive(Clone)]
pub struct PgBookmarkRepository {
    pool: PgPool,
}

impl PgBookmarkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookmarkRepository for PgBookmarkRepository {
    async fn list(&self, user_id: Uuid, pdf_id: Uuid) -> DbResult<Vec<BookmarkRow>> {
        let bookmarks = sqlx::query_as::<_, BookmarkRow>(
            r#"
            SELECT id, pdf_id, user_id, page, title, created_at
            FROM pdf_bookmarks
            WHERE pdf_id = $1 AND user_id = $2
            ORDER BY page ASC
            "#,
        )
        .bind(pdf_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookmarks)
    }

    async fn find_by_page(
        &self,
        user_id: Uuid,
        pdf_id: Uuid,
        page: i32,
    ) -> DbResult<Option<BookmarkRow>> {
        let bookmark = sqlx::query_as::<_, BookmarkRow>(
            r#"
            SELECT id, pdf_id, user_id, page, title, created_at
            FROM pdf_bookmarks
            WHERE pdf_id = $1 AND user_id = $2 AND page = $3
            "#,
        )
        .bind(pdf_id)
        .bind(user_id)
        .bind(page)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bookmark)
    }

    async fn create(&self, bookmark: CreateBookmark) -> DbResult<BookmarkRow> {
        let row = sqlx::query_as::<_, BookmarkRow>(
            r#"
            INSERT INTO pdf_bookmarks (id, pdf_id, user_id, page, title)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, pdf_id, user_id, page, title, created_at
            "#,
        )
        .bind(bookmark.id)
        .bind(bookmark.pdf_id)
        .bind(bookmark.user_id)
        .bind(bookmark.page)
        .bind(&bookmark.title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, "bookmark already exists for this page"))?;

        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, pdf_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM pdf_bookmarks WHERE id = $1 AND pdf_id = $2 AND user_id = $3",
        )
        .bind(id)
        .bind(pdf_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
