//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SubscriptionRow;
use crate::repo::{SubscriptionRepository, SubscriptionUpdate, UpsertSubscription};

const COLUMNS: &str = r#"id, user_id, stripe_id, price_id, stripe_price_id, currency, "interval",
       status, current_period_start, current_period_end, cancel_at_period_end, amount,
       started_at, customer_id, metadata, canceled_at, ended_at, created_at, updated_at"#;

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_active_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM subscriptions \
             WHERE user_id = $1 AND status IN ('active', 'trialing') \
             ORDER BY created_at DESC LIMIT 1"
        );
        let sub = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sub)
    }

    async fn find_by_stripe_id(&self, stripe_id: &str) -> DbResult<Option<SubscriptionRow>> {
        let sql = format!("SELECT {COLUMNS} FROM subscriptions WHERE stripe_id = $1");
        let sub = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(stripe_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sub)
    }

    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<SubscriptionRow> {
        let sql = format!(
            r#"
            INSERT INTO subscriptions (user_id, stripe_id, price_id, stripe_price_id, currency,
                "interval", status, current_period_start, current_period_end,
                cancel_at_period_end, amount, started_at, customer_id, metadata,
                canceled_at, ended_at)
            VALUES ($1, $2, $3, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (stripe_id) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                price_id = EXCLUDED.price_id,
                stripe_price_id = EXCLUDED.stripe_price_id,
                currency = EXCLUDED.currency,
                "interval" = EXCLUDED."interval",
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                amount = EXCLUDED.amount,
                started_at = EXCLUDED.started_at,
                customer_id = EXCLUDED.customer_id,
                metadata = EXCLUDED.metadata,
                canceled_at = EXCLUDED.canceled_at,
                ended_at = EXCLUDED.ended_at,
                updated_at = NOW()
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(sub.user_id)
            .bind(&sub.stripe_id)
            .bind(&sub.price_id)
            .bind(&sub.currency)
            .bind(&sub.interval)
            .bind(&sub.status)
            .bind(sub.current_period_start)
            .bind(sub.current_period_end)
            .bind(sub.cancel_at_period_end)
            .bind(sub.amount)
            .bind(sub.started_at)
            .bind(&sub.customer_id)
            .bind(&sub.metadata)
            .bind(sub.canceled_at)
            .bind(sub.ended_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn apply_update(&self, stripe_id: &str, update: SubscriptionUpdate) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET user_id = COALESCE($2, user_id),
                status = COALESCE($3, status),
                current_period_start = COALESCE($4, current_period_start),
                current_period_end = COALESCE($5, current_period_end),
                cancel_at_period_end = COALESCE($6, cancel_at_period_end),
                metadata = COALESCE($7, metadata),
                canceled_at = CASE WHEN $10 THEN $8 ELSE canceled_at END,
                ended_at = CASE WHEN $10 THEN $9 ELSE ended_at END,
                updated_at = NOW()
            WHERE stripe_id = $1
            "#,
        )
        .bind(stripe_id)
        .bind(update.user_id)
        .bind(&update.status)
        .bind(update.current_period_start)
        .bind(update.current_period_end)
        .bind(update.cancel_at_period_end)
        .bind(&update.metadata)
        .bind(update.canceled_at)
        .bind(update.ended_at)
        .bind(update.mirror_end_dates)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(&self, stripe_id: &str, status: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = $2, updated_at = NOW() WHERE stripe_id = $1",
        )
        .bind(stripe_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
