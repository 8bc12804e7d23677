use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::subscription_statuses::SubscriptionStatus,
    infra::db::postgres::schema::subscriptions,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Serialize, PartialEq)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }

    /// Expiry is observed lazily: a stored `active` row past its end date no longer counts.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status() == SubscriptionStatus::Active && self.end_date > now
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
}
