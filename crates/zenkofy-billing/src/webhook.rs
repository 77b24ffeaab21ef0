//! Stripe webhook verification and parsing

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

use crate::error::BillingError;

/// Maximum age of a signed webhook, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Webhook event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Customer subscription created
    CustomerSubscriptionCreated,
    /// Customer subscription updated
    CustomerSubscriptionUpdated,
    /// Customer subscription deleted
    CustomerSubscriptionDeleted,
    /// Checkout session completed
    CheckoutSessionCompleted,
    /// Invoice paid
    InvoicePaymentSucceeded,
    /// Invoice payment failed
    InvoicePaymentFailed,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Verified Stripe event
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    /// Event ID
    pub id: String,
    /// Event type, e.g. `customer.subscription.created`
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event was created (Unix timestamp)
    pub created: i64,
    /// Event payload
    pub data: StripeEventData,
}

/// `data` member of a Stripe event
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Typed event kind
    pub fn kind(&self) -> WebhookEventType {
        WebhookEventType::from(self.event_type.as_str())
    }

    /// Log category: the event type up to its first `.`
    pub fn category(&self) -> &str {
        self.event_type
            .split('.')
            .next()
            .unwrap_or(self.event_type.as_str())
    }

    /// Deserialize the event object into a Stripe resource
    pub fn object<T: for<'de> Deserialize<'de>>(&self) -> Result<T, BillingError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))
    }
}

/// Verifies `Stripe-Signature` headers against the endpoint secret
#[derive(Clone)]
pub struct WebhookVerifier {
    webhook_secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// Create a new verifier
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Override the timestamp tolerance
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify and parse a webhook payload
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<StripeEvent, BillingError> {
        self.verify_signature(payload, signature, Utc::now().timestamp())?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;

        debug!(event_id = %event.id, event_type = %event.event_type, "Parsed webhook event");
        Ok(event)
    }

    /// Verify a signature header relative to `now` (Unix seconds)
    pub fn verify_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now: i64,
    ) -> Result<(), BillingError> {
        // t=timestamp,v1=signature[,v1=signature...]
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => candidates.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            BillingError::InvalidSignature("missing timestamp".to_string())
        })?;

        if candidates.is_empty() {
            warn!("Missing v1 signature in webhook signature");
            return Err(BillingError::InvalidSignature(
                "missing v1 signature".to_string(),
            ));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| BillingError::InvalidSignature("invalid timestamp".to_string()))?;

        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| BillingError::Internal("HMAC error".to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let matched = candidates
            .iter()
            .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));

        if !matched {
            warn!("Webhook signature verification failed");
            return Err(BillingError::InvalidSignature(
                "signature mismatch".to_string(),
            ));
        }

        if (now - ts).abs() > self.tolerance_secs {
            warn!(timestamp = ts, now = now, "Webhook timestamp outside tolerance");
            return Err(BillingError::InvalidSignature(
                "timestamp outside tolerance".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}
