//! Webhook dispatcher
//!
//! Mirrors verified Stripe events into the `subscriptions` and
//! `webhook_events` tables. Every write is keyed by a Stripe id so a
//! redelivered event converges on the same rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use zenkofy_db::{NewWebhookEvent, Repositories, SubscriptionUpdate, UpsertSubscription};

use crate::error::BillingError;
use crate::provider::PaymentProvider;
use crate::stripe::{
    format_major_units, metadata_json, StripeCheckoutSession, StripeInvoice, StripeRef,
    StripeSubscription,
};
use crate::webhook::{StripeEvent, WebhookEventType};

/// Log kind used for invoice payment outcome records
pub const INVOICE_PAYMENT_KIND: &str = "invoice_payment";

/// Result of dispatching one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    /// Human-readable result returned to Stripe
    pub message: String,
    /// Subscription the event touched, when known
    pub subscription_id: Option<String>,
    /// Whether this delivery was the first one logged for the event
    pub first_delivery: bool,
}

impl WebhookOutcome {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subscription_id: None,
            first_delivery: true,
        }
    }

    fn with_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }
}

/// Dispatches verified events to their handlers
#[derive(Clone)]
pub struct WebhookProcessor {
    repos: Repositories,
    provider: Arc<dyn PaymentProvider>,
}

impl WebhookProcessor {
    pub fn new(repos: Repositories, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { repos, provider }
    }

    /// Log and dispatch one event
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn process(&self, event: &StripeEvent) -> Result<WebhookOutcome, BillingError> {
        let first_delivery = self.log_event(event).await?;
        if !first_delivery {
            debug!("Redelivered webhook event");
        }

        let mut outcome = match event.kind() {
            WebhookEventType::CustomerSubscriptionCreated => {
                self.subscription_created(event).await?
            }
            WebhookEventType::CustomerSubscriptionUpdated => {
                self.subscription_updated(event).await?
            }
            WebhookEventType::CustomerSubscriptionDeleted => {
                self.subscription_deleted(event).await?
            }
            WebhookEventType::CheckoutSessionCompleted => self.checkout_completed(event).await?,
            WebhookEventType::InvoicePaymentSucceeded => {
                self.invoice_payment(event, PaymentResult::Succeeded).await?
            }
            WebhookEventType::InvoicePaymentFailed => {
                self.invoice_payment(event, PaymentResult::Failed).await?
            }
            WebhookEventType::Unknown(event_type) => {
                info!("Unhandled event type");
                WebhookOutcome::new(format!("Unhandled event type: {event_type}"))
            }
        };

        outcome.first_delivery = first_delivery;
        Ok(outcome)
    }

    async fn log_event(&self, event: &StripeEvent) -> Result<bool, BillingError> {
        let inserted = self
            .repos
            .webhook_events
            .record(NewWebhookEvent {
                event_type: event.event_type.clone(),
                kind: event.category().to_string(),
                stripe_event_id: event.id.clone(),
                data: event.data.object.clone(),
                created_at: event_time(event),
            })
            .await?;
        Ok(inserted)
    }

    async fn subscription_created(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, BillingError> {
        let sub: StripeSubscription = event.object()?;
        info!(subscription_id = %sub.id, "Handling subscription created");

        let user_id = self.resolve_owner(&sub).await?;

        self.repos
            .subscriptions
            .upsert(UpsertSubscription {
                user_id,
                stripe_id: sub.id.clone(),
                price_id: sub.price_id().map(str::to_string),
                currency: sub.currency.clone(),
                interval: sub.interval().map(str::to_string),
                status: sub.status.clone(),
                current_period_start: sub.current_period_start,
                current_period_end: sub.current_period_end,
                cancel_at_period_end: sub.cancel_at_period_end,
                amount: Some(sub.amount().unwrap_or(0)),
                started_at: Some(sub.start_date.unwrap_or_else(|| Utc::now().timestamp())),
                customer_id: sub.customer.as_ref().map(|c| c.id().to_string()),
                metadata: sub.metadata_json(),
                canceled_at: sub.canceled_at,
                ended_at: sub.ended_at,
            })
            .await?;

        Ok(WebhookOutcome::new("Subscription created successfully").with_subscription(sub.id))
    }

    /// Owner from metadata, falling back to the Stripe customer's email
    async fn resolve_owner(&self, sub: &StripeSubscription) -> Result<Uuid, BillingError> {
        if let Some(raw) = sub
            .metadata_value("user_id")
            .or_else(|| sub.metadata_value("userId"))
        {
            return Uuid::parse_str(raw).map_err(|_| {
                warn!(user_id = %raw, "Subscription metadata carries a malformed user id");
                BillingError::UserNotResolved
            });
        }

        let customer_id = sub.customer.as_ref().map(StripeRef::id).ok_or_else(|| {
            warn!("Subscription has no customer");
            BillingError::UserNotResolved
        })?;

        let customer = self
            .provider
            .retrieve_customer(customer_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Unable to retrieve customer");
                BillingError::UserNotResolved
            })?;

        let email = customer.email.ok_or_else(|| {
            warn!(customer_id = %customer_id, "Customer has no email");
            BillingError::UserNotResolved
        })?;

        self.repos
            .users
            .find_id_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!("No user registered for customer email");
                BillingError::UserNotResolved
            })
    }

    async fn subscription_updated(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, BillingError> {
        let sub: StripeSubscription = event.object()?;
        info!(subscription_id = %sub.id, "Handling subscription updated");

        let matched = self
            .repos
            .subscriptions
            .apply_update(
                &sub.id,
                SubscriptionUpdate {
                    status: Some(sub.status.clone()),
                    current_period_start: sub.current_period_start,
                    current_period_end: sub.current_period_end,
                    cancel_at_period_end: Some(sub.cancel_at_period_end),
                    metadata: Some(sub.metadata_json()),
                    canceled_at: sub.canceled_at,
                    ended_at: sub.ended_at,
                    mirror_end_dates: true,
                    ..Default::default()
                },
            )
            .await?;
        if !matched {
            debug!(subscription_id = %sub.id, "No local subscription to update");
        }

        Ok(WebhookOutcome::new("Subscription updated successfully").with_subscription(sub.id))
    }

    async fn subscription_deleted(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, BillingError> {
        let sub: StripeSubscription = event.object()?;
        info!(subscription_id = %sub.id, "Handling subscription deleted");

        self.repos
            .subscriptions
            .update_status(&sub.id, "canceled")
            .await?;

        if let Some(email) = sub.metadata_value("email") {
            let cleared = self.repos.users.clear_subscription_by_email(email).await?;
            debug!(cleared, "Cleared user subscription marker");
        }

        Ok(WebhookOutcome::new("Subscription deleted successfully").with_subscription(sub.id))
    }

    async fn checkout_completed(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, BillingError> {
        let session: StripeCheckoutSession = event.object()?;
        info!(session_id = %session.id, "Handling checkout session completed");

        let Some(subscription_id) = session.subscription.as_ref().map(|s| s.id().to_string())
        else {
            debug!("No subscription in checkout session");
            return Ok(WebhookOutcome::new("No subscription in checkout session"));
        };

        let stripe_sub = self.provider.retrieve_subscription(&subscription_id).await?;

        let mut metadata: BTreeMap<String, String> = session.metadata.clone().unwrap_or_default();
        metadata.insert("checkoutSessionId".to_string(), session.id.clone());

        self.provider
            .update_subscription_metadata(&subscription_id, &metadata)
            .await?;

        let user_id = metadata
            .get("userId")
            .or_else(|| metadata.get("user_id"))
            .filter(|v| !v.is_empty())
            .and_then(|raw| match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(user_id = %raw, "Checkout metadata carries a malformed user id");
                    None
                }
            });

        let matched = self
            .repos
            .subscriptions
            .apply_update(
                &subscription_id,
                SubscriptionUpdate {
                    user_id,
                    status: Some(stripe_sub.status.clone()),
                    current_period_start: stripe_sub.current_period_start,
                    current_period_end: stripe_sub.current_period_end,
                    cancel_at_period_end: Some(stripe_sub.cancel_at_period_end),
                    metadata: Some(metadata_json(Some(&metadata))),
                    ..Default::default()
                },
            )
            .await?;
        if !matched {
            debug!(subscription_id = %subscription_id, "No local subscription for checkout yet");
        }

        Ok(WebhookOutcome::new("Checkout session completed successfully")
            .with_subscription(subscription_id))
    }

    async fn invoice_payment(
        &self,
        event: &StripeEvent,
        result: PaymentResult,
    ) -> Result<WebhookOutcome, BillingError> {
        let invoice: StripeInvoice = event.object()?;
        info!(invoice_id = %invoice.id, result = result.as_str(), "Handling invoice payment");

        let subscription_id = invoice.subscription.as_ref().map(|s| s.id().to_string());

        let mut data = serde_json::json!({
            "invoiceId": invoice.id,
            "subscriptionId": subscription_id,
            "currency": invoice.currency,
            "status": result.as_str(),
            "email": invoice.customer_email,
        });
        let (amount_key, amount) = match result {
            PaymentResult::Succeeded => ("amountPaid", invoice.amount_paid),
            PaymentResult::Failed => ("amountDue", invoice.amount_due),
        };
        data[amount_key] = serde_json::Value::String(format_major_units(amount));

        self.repos
            .webhook_events
            .record(NewWebhookEvent {
                event_type: event.event_type.clone(),
                kind: INVOICE_PAYMENT_KIND.to_string(),
                stripe_event_id: event.id.clone(),
                data,
                created_at: event_time(event),
            })
            .await?;

        if let (PaymentResult::Failed, Some(id)) = (result, subscription_id.as_deref()) {
            self.repos.subscriptions.update_status(id, "past_due").await?;
        }

        let message = match result {
            PaymentResult::Succeeded => "Invoice payment succeeded",
            PaymentResult::Failed => "Invoice payment failed",
        };
        let outcome = WebhookOutcome::new(message);
        Ok(match subscription_id {
            Some(id) => outcome.with_subscription(id),
            None => outcome,
        })
    }
}

impl std::fmt::Debug for WebhookProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookProcessor").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentResult {
    Succeeded,
    Failed,
}

impl PaymentResult {
    fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

fn event_time(event: &StripeEvent) -> DateTime<Utc> {
    DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now)
}
