use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::usages::UsageEntity,
    value_objects::{enums::features::Feature, plans::Limit},
};

#[automock]
#[async_trait]
pub trait UsageRepository {
    async fn find_or_create(
        &self,
        user_id: Uuid,
        feature: Feature,
        period_month: NaiveDate,
    ) -> Result<UsageEntity>;

    /// Adds one use when the counter is still below `limit`, in a single
    /// conditional write. Returns the new count, or `None` when the limit was
    /// already reached. The period row must exist.
    async fn increment_within_limit(
        &self,
        user_id: Uuid,
        feature: Feature,
        period_month: NaiveDate,
        limit: Limit,
    ) -> Result<Option<i32>>;
}
