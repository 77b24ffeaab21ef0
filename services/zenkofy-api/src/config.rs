//! Configuration for the Zenkofy API service.

use std::time::Duration;

use zenkofy_billing::BillingConfig;

/// Default upload ceiling (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// API configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase service role key (storage writes)
    pub supabase_service_role_key: String,
    /// Supabase JWT secret (access token verification)
    pub supabase_jwt_secret: String,
    /// Storage bucket for uploaded PDFs
    pub storage_bucket: String,
    /// Billing core configuration
    pub billing: BillingConfig,
    /// Request timeout
    pub request_timeout: Duration,
    /// Upload size ceiling in bytes
    pub max_upload_bytes: usize,
    /// Metrics enabled
    pub metrics_enabled: bool,
    /// Public app URL, used for checkout redirects
    pub app_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        // Database
        let database_url = required("DATABASE_URL")?;

        // Supabase
        let supabase_url = required("SUPABASE_URL")?;
        let supabase_service_role_key = required("SUPABASE_SERVICE_ROLE_KEY")?;
        let supabase_jwt_secret = required("SUPABASE_JWT_SECRET")?;
        let storage_bucket = lookup("STORAGE_BUCKET").unwrap_or_else(|| "pdfs".to_string());

        // Stripe
        let stripe_secret_key = required("STRIPE_SECRET_KEY")?;
        let stripe_webhook_secret = required("STRIPE_WEBHOOK_SECRET")?;

        let http_port = lookup("HTTP_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        let request_timeout_secs: u64 = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("MAX_UPLOAD_BYTES"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let metrics_enabled = lookup("METRICS_ENABLED")
            .unwrap_or_else(|| "true".to_string())
            .parse()
            .unwrap_or(true);

        let app_url = lookup("APP_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http_port,
            database_url,
            supabase_url,
            supabase_service_role_key,
            supabase_jwt_secret,
            storage_bucket,
            billing: BillingConfig::new(stripe_secret_key, stripe_webhook_secret),
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_upload_bytes,
            metrics_enabled,
            app_url,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("supabase_url", &self.supabase_url)
            .field("storage_bucket", &self.storage_bucket)
            .field("billing", &self.billing)
            .field("request_timeout", &self.request_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("app_url", &self.app_url)
            .finish_non_exhaustive()
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
