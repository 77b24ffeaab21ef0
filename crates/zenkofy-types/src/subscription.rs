//! Subscription types mirrored from the billing provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SubscriptionId, UserId};

/// Subscription status as reported by Stripe
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is active
    Active,
    /// In trial period
    Trialing,
    /// Payment is past due
    PastDue,
    /// Subscription was canceled
    Canceled,
    /// Initial payment not yet completed
    Incomplete,
    /// Initial payment never completed
    IncompleteExpired,
    /// Unpaid after retries
    Unpaid,
    /// Collection paused
    Paused,
    /// Status string this build does not know about
    #[serde(untagged)]
    Other(String),
}

impl SubscriptionStatus {
    /// Whether this status grants access to the reader
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    /// Stripe representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// User who owns the subscription
    pub user_id: UserId,
    /// Stripe subscription ID
    pub stripe_id: String,
    /// Stripe price ID
    pub price_id: Option<String>,
    /// Subscription status
    pub status: SubscriptionStatus,
    /// Billing interval (month, year)
    pub interval: Option<String>,
    /// Amount per interval in minor units
    pub amount: Option<i64>,
    /// Currency code
    pub currency: Option<String>,
    /// Current billing period start (unix seconds)
    pub current_period_start: Option<i64>,
    /// Current billing period end (unix seconds)
    pub current_period_end: Option<i64>,
    /// Whether the subscription ends with the current period
    pub cancel_at_period_end: bool,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}
