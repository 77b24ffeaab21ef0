//! Payment provider abstraction

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::stripe::{StripeCheckoutSession, StripeCustomer, StripePlan, StripeSubscription};
use crate::BillingError;

/// Input for a subscription checkout
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub user_id: String,
    pub email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Payment provider trait
///
/// The webhook dispatcher and the checkout/plan endpoints go through this
/// seam so tests can stand in for Stripe.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Retrieve a customer
    async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer, BillingError>;

    /// Retrieve a subscription
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, BillingError>;

    /// Merge keys into a subscription's metadata
    async fn update_subscription_metadata(
        &self,
        subscription_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<StripeSubscription, BillingError>;

    /// Active recurring plans
    async fn list_active_plans(&self) -> Result<Vec<StripePlan>, BillingError>;

    /// Create a checkout session in subscription mode
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<StripeCheckoutSession, BillingError>;
}
