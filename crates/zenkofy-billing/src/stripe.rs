//! Stripe payment provider implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::provider::{CheckoutRequest, PaymentProvider};

/// Stripe payment provider
#[derive(Clone)]
pub struct StripeProvider {
    client: Client,
    config: BillingConfig,
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(config: BillingConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// Make authenticated request to Stripe. Parameters go in the query
    /// string for GET and form-encoded in the body otherwise.
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, BillingError> {
        let url = format!("{}{endpoint}", self.config.api_base);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .basic_auth(&self.config.stripe_secret_key, Option::<&str>::None);

        if !params.is_empty() {
            request = if method == reqwest::Method::GET {
                request.query(params)
            } else {
                request.form(params)
            };
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Stripe API request failed");
            BillingError::ProviderError(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Stripe API error");
            return Err(BillingError::ProviderError(format!(
                "Stripe API error: {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Stripe response");
            BillingError::ProviderError(e.to_string())
        })
    }
}

fn param(key: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (key.into(), value.into())
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self))]
    async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer, BillingError> {
        debug!(customer_id = %customer_id, "Getting Stripe customer");

        self.stripe_request(
            reqwest::Method::GET,
            &format!("/customers/{customer_id}"),
            &[],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, BillingError> {
        debug!(subscription_id = %subscription_id, "Getting Stripe subscription");

        self.stripe_request(
            reqwest::Method::GET,
            &format!("/subscriptions/{subscription_id}"),
            &[],
        )
        .await
    }

    #[instrument(skip(self, metadata))]
    async fn update_subscription_metadata(
        &self,
        subscription_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<StripeSubscription, BillingError> {
        debug!(subscription_id = %subscription_id, keys = metadata.len(), "Updating subscription metadata");

        let form: Vec<(String, String)> = metadata
            .iter()
            .map(|(k, v)| param(format!("metadata[{k}]"), v.as_str()))
            .collect();

        self.stripe_request(
            reqwest::Method::POST,
            &format!("/subscriptions/{subscription_id}"),
            &form,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_active_plans(&self) -> Result<Vec<StripePlan>, BillingError> {
        debug!("Listing active plans");

        let list: StripeList<StripePlan> = self
            .stripe_request(
                reqwest::Method::GET,
                "/plans",
                &[param("active", "true"), param("limit", "100")],
            )
            .await?;

        Ok(list.data)
    }

    #[instrument(skip(self, request), fields(price_id = %request.price_id))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<StripeCheckoutSession, BillingError> {
        debug!(user_id = %request.user_id, "Creating checkout session");

        let mut form = vec![
            param("mode", "subscription"),
            param("success_url", request.success_url.as_str()),
            param("cancel_url", request.cancel_url.as_str()),
            param("line_items[0][price]", request.price_id.as_str()),
            param("line_items[0][quantity]", "1"),
            param("metadata[user_id]", request.user_id.as_str()),
            param("subscription_data[metadata][user_id]", request.user_id.as_str()),
        ];
        if let Some(email) = &request.email {
            form.push(param("customer_email", email.as_str()));
            form.push(param("metadata[email]", email.as_str()));
            form.push(param("subscription_data[metadata][email]", email.as_str()));
        }

        self.stripe_request(reqwest::Method::POST, "/checkout/sessions", &form)
            .await
    }
}

impl std::fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Stripe API response types

/// Reference to another Stripe object, either its id or the expanded object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StripeRef {
    Id(String),
    Expanded { id: String },
}

impl StripeRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

/// Stripe customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCustomer {
    /// Customer ID
    pub id: String,
    /// Customer email
    pub email: Option<String>,
}

/// Stripe subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeSubscription {
    /// Subscription ID
    pub id: String,
    /// Customer
    pub customer: Option<StripeRef>,
    /// Subscription status
    pub status: String,
    /// Three-letter currency code
    #[serde(default)]
    pub currency: Option<String>,
    /// Current period start (Unix timestamp)
    #[serde(default)]
    pub current_period_start: Option<i64>,
    /// Current period end (Unix timestamp)
    #[serde(default)]
    pub current_period_end: Option<i64>,
    /// Whether subscription cancels at period end
    #[serde(default)]
    pub cancel_at_period_end: bool,
    /// Start date (Unix timestamp)
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<i64>,
    /// Key/value metadata
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Subscription items
    #[serde(default)]
    pub items: Option<StripeList<StripeSubscriptionItem>>,
}

impl StripeSubscription {
    fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.as_ref().and_then(|items| items.data.first())
    }

    /// Price of the first item
    pub fn price_id(&self) -> Option<&str> {
        self.first_item()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
    }

    /// Billing interval of the first item
    pub fn interval(&self) -> Option<&str> {
        self.first_item()
            .and_then(|item| item.plan.as_ref())
            .and_then(|plan| plan.interval.as_deref())
    }

    /// Amount of the first item's plan, in minor units
    pub fn amount(&self) -> Option<i64> {
        self.first_item()
            .and_then(|item| item.plan.as_ref())
            .and_then(|plan| plan.amount)
    }

    /// Metadata value, empty strings treated as absent
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn metadata_json(&self) -> serde_json::Value {
        metadata_json(self.metadata.as_ref())
    }
}

/// Convert Stripe metadata into a JSON object
pub fn metadata_json(metadata: Option<&BTreeMap<String, String>>) -> serde_json::Value {
    let map = metadata
        .map(|m| {
            m.iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect()
        })
        .unwrap_or_default();
    serde_json::Value::Object(map)
}

/// Subscription item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: Option<String>,
    #[serde(default)]
    pub price: Option<StripePrice>,
    #[serde(default)]
    pub plan: Option<StripePlan>,
}

/// Stripe price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

/// Stripe plan, as returned by the plans list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePlan {
    /// Plan ID
    pub id: String,
    #[serde(default)]
    pub active: bool,
    /// Amount in minor units
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// `day`, `week`, `month` or `year`
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub interval_count: Option<i64>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub product: Option<StripeRef>,
}

/// Stripe checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCheckoutSession {
    /// Session ID
    pub id: String,
    /// Checkout URL
    #[serde(default)]
    pub url: Option<String>,
    /// Customer
    #[serde(default)]
    pub customer: Option<StripeRef>,
    /// Subscription (after completion)
    #[serde(default)]
    pub subscription: Option<StripeRef>,
    /// Key/value metadata
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Stripe invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeInvoice {
    /// Invoice ID
    pub id: String,
    /// Subscription the invoice belongs to
    #[serde(default)]
    pub subscription: Option<StripeRef>,
    /// Amount due in minor units
    #[serde(default)]
    pub amount_due: i64,
    /// Amount paid in minor units
    #[serde(default)]
    pub amount_paid: i64,
    /// Currency
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// Stripe list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeList<T> {
    /// List data
    pub data: Vec<T>,
    /// Whether there are more items
    #[serde(default)]
    pub has_more: bool,
}

/// Render minor currency units the way a JavaScript number division would,
/// e.g. `999` as `"9.99"`, `1000` as `"10"` and `1050` as `"10.5"`.
pub fn format_major_units(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let whole = abs / 100;
    let cents = abs % 100;
    match cents {
        0 => format!("{sign}{whole}"),
        c if c % 10 == 0 => format!("{sign}{whole}.{}", c / 10),
        c => format!("{sign}{whole}.{c:02}"),
    }
}
