//! Subscription, plan and checkout handlers

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use zenkofy_billing::{CheckoutRequest, StripePlan};
use zenkofy_types::Subscription;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::handlers::shared::{non_empty, record_op_duration};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscribed: bool,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<StripePlan>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub price_id: Option<String>,
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<SubscriptionResponse>> {
    let row = state
        .repos
        .subscriptions
        .find_active_by_user_id(user.user_id.0)
        .await?;

    let subscription = row.map(Subscription::from);
    Ok(Json(SubscriptionResponse {
        subscribed: subscription
            .as_ref()
            .is_some_and(|s| s.status.grants_access()),
        subscription,
    }))
}

/// GET /api/plans
pub async fn list_plans(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<PlansResponse>> {
    let start = Instant::now();
    let result = state.payments.list_active_plans().await;
    record_op_duration("list_plans", start, result.is_ok());

    Ok(Json(PlansResponse { plans: result? }))
}

/// POST /api/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateCheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let start = Instant::now();

    let price_id = non_empty(req.price_id)
        .ok_or_else(|| ApiError::BadRequest("price_id is required".into()))?;

    let app_url = &state.config.app_url;
    let request = CheckoutRequest {
        price_id,
        user_id: user.user_id.to_string(),
        email: user.email.clone(),
        success_url: non_empty(req.return_url).unwrap_or_else(|| format!("{app_url}/dashboard")),
        cancel_url: format!("{app_url}/pricing"),
    };

    let result = state.payments.create_checkout_session(&request).await;
    record_op_duration("create_checkout", start, result.is_ok());
    let session = result?;

    tracing::info!(user_id = %user.user_id, session_id = %session.id, "Checkout session created");

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}
