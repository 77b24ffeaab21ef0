//! Stripe webhook handler

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use zenkofy_billing::BillingError;

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

/// POST /webhooks/stripe
///
/// Verify the `Stripe-Signature` header against the raw body, then log and
/// dispatch the event.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let start = Instant::now();
    let result = handle(&state, &headers, &body).await;

    let status = match &result {
        Ok(_) => "success",
        Err(ApiError::Billing(e)) if e.is_bad_request() => "rejected",
        Err(_) => "error",
    };
    metrics::counter!("zenkofy_webhooks_processed_total", "status" => status).increment(1);
    record_op_duration("process_webhook", start, result.is_ok());

    if let Err(e) = &result {
        tracing::warn!(error = %e, "Webhook processing failed");
    }
    result
}

async fn handle(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<Json<WebhookResponse>> {
    let signature = headers
        .get("stripe-signature")
        .ok_or(BillingError::MissingSignature)?
        .to_str()
        .map_err(|_| BillingError::InvalidSignature("header is not valid ASCII".into()))?;

    let event = state.verifier.verify_and_parse(body, signature)?;
    let outcome = state.webhooks.process(&event).await?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        first_delivery = outcome.first_delivery,
        "Webhook processed"
    );

    Ok(Json(WebhookResponse {
        message: outcome.message,
        subscription_id: outcome.subscription_id,
    }))
}
