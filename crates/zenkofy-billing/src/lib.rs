//! Zenkofy Billing - Stripe integration
//!
//! Stripe REST client, webhook signature verification and the dispatcher
//! that mirrors subscription events into the database.
//!
//! # Example
//!
//! ```rust,ignore
//! use zenkofy_billing::{BillingConfig, StripeProvider, WebhookProcessor, WebhookVerifier};
//!
//! let config = BillingConfig::new("sk_test_...", "whsec_...");
//! let provider = Arc::new(StripeProvider::new(config.clone()));
//! let verifier = WebhookVerifier::new(&config.stripe_webhook_secret);
//! let processor = WebhookProcessor::new(repos, provider);
//!
//! let event = verifier.verify_and_parse(&body, signature)?;
//! let outcome = processor.process(&event).await?;
//! ```

pub mod config;
pub mod error;
pub mod processor;
pub mod provider;
pub mod stripe;
pub mod webhook;

pub use config::BillingConfig;
pub use error::BillingError;
pub use processor::{WebhookOutcome, WebhookProcessor, INVOICE_PAYMENT_KIND};
pub use provider::{CheckoutRequest, PaymentProvider};
pub use stripe::{
    StripeCheckoutSession, StripeCustomer, StripeInvoice, StripePlan, StripeProvider, StripeRef,
    StripeSubscription,
};
pub use webhook::{StripeEvent, WebhookEventType, WebhookVerifier};
