//! Error types for the Zenkofy API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use zenkofy_auth::AuthError;
use zenkofy_billing::BillingError;
use zenkofy_db::DbError;
use zenkofy_storage::StorageError;
use zenkofy_types::ValidationError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Billing(#[from] BillingError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::Database(DbError::NotFound) => StatusCode::NOT_FOUND,
            Self::Billing(e) if e.is_bad_request() => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Database(_) | Self::Storage(_) | Self::Billing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(e) => e.error_code(),
            Self::BadRequest(_) | Self::Validation(_) => "BAD_REQUEST",
            Self::NotFound(_) | Self::Database(DbError::NotFound) => "NOT_FOUND",
            Self::Billing(BillingError::MissingSignature | BillingError::InvalidSignature(_)) => {
                "INVALID_SIGNATURE"
            }
            Self::Billing(BillingError::InvalidPayload(_)) => "INVALID_PAYLOAD",
            Self::Billing(BillingError::UserNotResolved) => "USER_NOT_RESOLVED",
            Self::Billing(BillingError::ProviderError(_)) => "PROVIDER_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) | Self::Billing(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Billing(BillingError::UserNotResolved) => {
                "Unable to find associated user".to_string()
            }
            Self::Billing(BillingError::MissingSignature) => "No signature found".to_string(),
            Self::Billing(BillingError::InvalidSignature(_)) => "Invalid signature".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log internal errors
        if status.is_server_error() {
            tracing::error!(error = ?self, "Internal API error");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.message(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
