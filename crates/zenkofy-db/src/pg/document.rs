//! PostgreSQL document repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::DocumentRow;
use crate::repo::{CreateDocument, DocumentFilter, DocumentRepository, UpdateDocument};

use super::like_pattern;

/// PostgreSQL document repository
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    /// Create a new document repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn list(&self, user_id: Uuid, filter: &DocumentFilter) -> DbResult<Vec<DocumentRow>> {
        let search = filter.search.as_deref().map(like_pattern);

        let docs = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, user_id, title, author, file_path, file_url, cover_url, tags,
                   status, progress, last_read, created_at
            FROM pdfs
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR title ILIKE $3 OR author ILIKE $3)
              AND ($4::TEXT IS NULL OR $4 = ANY(tags))
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(search)
        .bind(filter.tag.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(docs)
    }

    async fn find(&self, user_id: Uuid, id: Uuid) -> DbResult<Option<DocumentRow>> {
        let doc = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, user_id, title, author, file_path, file_url, cover_url, tags,
                   status, progress, last_read, created_at
            FROM pdfs
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc)
    }

    async fn create(&self, doc: CreateDocument) -> DbResult<DocumentRow> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO pdfs (id, user_id, title, author, file_path, file_url, cover_url,
                              tags, status, progress)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'to-read', 0)
            RETURNING id, user_id, title, author, file_path, file_url, cover_url, tags,
                      status, progress, last_read, created_at
            "#,
        )
        .bind(doc.id)
        .bind(doc.user_id)
        .bind(&doc.title)
        .bind(&doc.author)
        .bind(&doc.file_path)
        .bind(&doc.file_url)
        .bind(&doc.cover_url)
        .bind(&doc.tags)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| crate::DbError::from_insert(e, "pdfs"))?;

        Ok(row)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: UpdateDocument,
    ) -> DbResult<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE pdfs
            SET status = COALESCE($3, status),
                progress = COALESCE($4, progress),
                tags = COALESCE($5, tags),
                last_read = COALESCE($6, last_read)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, author, file_path, file_url, cover_url, tags,
                      status, progress, last_read, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.progress.map(|p| i32::from(p.value())))
        .bind(update.tags)
        .bind(update.last_read)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM pdfs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
