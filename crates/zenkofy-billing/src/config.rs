//! Billing configuration

/// Stripe REST base URL
pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Billing service configuration
#[derive(Clone)]
pub struct BillingConfig {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// REST base URL, overridable for tests
    pub api_base: String,
}

impl BillingConfig {
    /// Create a new billing config
    pub fn new(
        stripe_secret_key: impl Into<String>,
        stripe_webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            stripe_secret_key: stripe_secret_key.into(),
            stripe_webhook_secret: stripe_webhook_secret.into(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("stripe_secret_key", &"[REDACTED]")
            .field("stripe_webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}
