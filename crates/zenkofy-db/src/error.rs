//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration failure
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write
    #[error("duplicate record: {0}")]
    Conflict(String),

    /// A stored value could not be mapped to its domain type
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Result alias for repository operations
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Map a Postgres unique violation (23505) to [`DbError::Conflict`]
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                return Self::Conflict(what.to_string());
            }
        }
        Self::Sqlx(err)
    }
}
