//! PostgreSQL note repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::NoteRow;
use crate::repo::{CreateNote, NoteRepository};

/// PostgreSQL note repository
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self, user_id: Uuid, pdf_id: Uuid) -> DbResult<Vec<NoteRow>> {
        let notes = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT id, pdf_id, user_id, page, text, color, created_at
            FROM pdf_notes
            WHERE pdf_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(pdf_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    async fn create(&self, note: CreateNote) -> DbResult<NoteRow> {
        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            INSERT INTO pdf_notes (id, pdf_id, user_id, page, text, color)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, pdf_id, user_id, page, text, color, created_at
            "#,
        )
        .bind(note.id)
        .bind(note.pdf_id)
        .bind(note.user_id)
        .bind(note.page)
        .bind(&note.text)
        .bind(&note.color)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, pdf_id: Uuid, id: Uuid) -> DbResult<bool> {
        let result =
            sqlx::query("DELETE FROM pdf_notes WHERE id = $1 AND pdf_id = $2 AND user_id = $3")
                .bind(id)
                .bind(pdf_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
