//! Validation errors for domain values

use thiserror::Error;

/// Errors raised when constructing domain values from user input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Unknown reading status string
    #[error("invalid status: {0} (expected to-read, reading or completed)")]
    InvalidStatus(String),

    /// Progress outside 0..=100
    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),

    /// Page numbers start at 1
    #[error("page must be a positive number, got {0}")]
    InvalidPage(i64),
}
