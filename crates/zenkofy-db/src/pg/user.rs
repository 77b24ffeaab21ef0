//! PostgreSQL user lookups

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repo::UserRepository;

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_id_by_email(&self, email: &str) -> DbResult<Option<Uuid>> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }

    async fn clear_subscription_by_email(&self, email: &str) -> DbResult<u64> {
        let result = sqlx::query("UPDATE users SET subscription = NULL WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
