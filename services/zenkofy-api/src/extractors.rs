//! Axum extractors for authentication and request bodies

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;

use zenkofy_auth::AuthError;
use zenkofy_types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Cookie carrying the Supabase access token
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = extract_token(parts)?;

        let identity = app_state.tokens.authenticate(&token).map_err(|e| {
            tracing::debug!(error = ?e, "Token validation failed");
            ApiError::Unauthorized(e)
        })?;

        Ok(Self {
            user_id: identity.user_id,
            email: identity.email,
        })
    }
}

/// Extract token from Authorization header or access token cookie
fn extract_token(parts: &Parts) -> Result<String, ApiError> {
    // Try Authorization header first (Bearer token)
    if let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::Unauthorized(AuthError::InvalidToken))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    // Try access token cookie
    for cookie_header in parts.headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = cookie_header.to_str() else {
            continue;
        };

        for cookie in cookie_str.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                if name == ACCESS_TOKEN_COOKIE && !value.is_empty() {
                    return Ok(value.to_string());
                }
            }
        }
    }

    Err(ApiError::Unauthorized(AuthError::MissingToken))
}

/// JSON body whose rejections surface as 400 in the API error format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}
