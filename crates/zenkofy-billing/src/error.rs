//! Billing errors

use thiserror::Error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// No `Stripe-Signature` header on the request
    #[error("no signature found")]
    MissingSignature,

    /// Signature header malformed, stale or not matching the payload
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Payload is not a well-formed Stripe event
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A subscription event could not be tied to a local user
    #[error("unable to find associated user")]
    UserNotResolved,

    /// Payment provider error
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] zenkofy_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Whether the sender is at fault
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::MissingSignature
                | Self::InvalidSignature(_)
                | Self::InvalidPayload(_)
                | Self::UserNotResolved
        )
    }

    /// Check if this is a provider error
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::ProviderError(_))
    }
}
