//! Application state for the Zenkofy API service.

use std::sync::Arc;

use zenkofy_auth::{AuthConfig, TokenValidator};
use zenkofy_billing::{PaymentProvider, WebhookProcessor, WebhookVerifier};
use zenkofy_db::Repositories;
use zenkofy_storage::ObjectStore;

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database repositories
    pub repos: Repositories,
    /// Object storage for uploaded PDFs
    pub storage: Arc<dyn ObjectStore>,
    /// Stripe (plans, checkout)
    pub payments: Arc<dyn PaymentProvider>,
    /// Access token verification
    pub tokens: Arc<TokenValidator>,
    /// Webhook signature verification
    pub verifier: Arc<WebhookVerifier>,
    /// Webhook dispatcher
    pub webhooks: Arc<WebhookProcessor>,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: Config,
        repos: Repositories,
        storage: Arc<dyn ObjectStore>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        let auth = AuthConfig::new(config.supabase_jwt_secret.clone())
            .with_supabase_issuer(&config.supabase_url);
        let verifier = WebhookVerifier::new(config.billing.stripe_webhook_secret.clone());
        let webhooks = WebhookProcessor::new(repos.clone(), payments.clone());

        Self {
            repos,
            storage,
            payments,
            tokens: Arc::new(TokenValidator::new(&auth)),
            verifier: Arc::new(verifier),
            webhooks: Arc::new(webhooks),
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
