use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::subscriptions::{ActivationOutcome, SubscriptionActivation},
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// `status = active AND end_date > now`.
    async fn find_active_by_user_id(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Atomically supersedes the user's active subscription with a new one and
    /// stamps its id onto the paying transaction. When the transaction already
    /// carries a subscription id nothing is written and that id is returned.
    async fn activate_for_transaction(
        &self,
        activation: SubscriptionActivation,
    ) -> Result<ActivationOutcome>;
}
