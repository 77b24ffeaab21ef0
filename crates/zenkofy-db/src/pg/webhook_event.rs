//! PostgreSQL webhook event log

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::repo::{NewWebhookEvent, WebhookEventRepository};

/// PostgreSQL webhook event repository
#[derive(Clone)]
pub struct PgWebhookEventRepository {
    pool: PgPool,
}

impl PgWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PgWebhookEventRepository {
    async fn record(&self, event: NewWebhookEvent) -> DbResult<bool> {
        // xmax is zero only for a freshly inserted tuple
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events (event_type, type, stripe_event_id, data, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (stripe_event_id, type) DO UPDATE
            SET event_type = EXCLUDED.event_type,
                data = EXCLUDED.data,
                modified_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&event.event_type)
        .bind(&event.kind)
        .bind(&event.stripe_event_id)
        .bind(&event.data)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }
}
