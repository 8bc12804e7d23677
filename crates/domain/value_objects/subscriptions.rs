use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Input for activating the subscription bought by one successful transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionActivation {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivationOutcome {
    pub subscription_id: Uuid,
    /// Previously active subscription that was canceled by this activation.
    pub superseded_subscription_id: Option<Uuid>,
    /// False when the transaction already carried a subscription id.
    pub newly_created: bool,
}
