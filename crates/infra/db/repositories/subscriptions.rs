use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{subscriptions, transactions},
    },
};
use domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        subscriptions::{ActivationOutcome, SubscriptionActivation},
    },
};

// Transaction-scoped lock on the user's subscription slot.
const USER_SLOT_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_active_by_user_id(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .filter(subscriptions::end_date.gt(now))
            .filter(subscriptions::deleted_at.is_null())
            .order(subscriptions::start_date.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn activate_for_transaction(
        &self,
        activation: SubscriptionActivation,
    ) -> Result<ActivationOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<ActivationOutcome, diesel::result::Error, _>(|tx| {
            // Two different payments for the same user must not both see an empty slot.
            diesel::sql_query(USER_SLOT_LOCK_SQL)
                .bind::<diesel::sql_types::Text, _>(activation.user_id.to_string())
                .execute(tx)?;

            // Row lock serialises a webhook and a status poll racing on the same payment.
            let stamped = transactions::table
                .filter(transactions::id.eq(activation.transaction_id))
                .select(transactions::subscription_id)
                .for_update()
                .first::<Option<Uuid>>(tx)?;

            if let Some(subscription_id) = stamped {
                return Ok(ActivationOutcome {
                    subscription_id,
                    superseded_subscription_id: None,
                    newly_created: false,
                });
            }

            let superseded = update(subscriptions::table)
                .filter(subscriptions::user_id.eq(activation.user_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .filter(subscriptions::deleted_at.is_null())
                .set(subscriptions::status.eq(SubscriptionStatus::Canceled.to_string()))
                .returning(subscriptions::id)
                .get_results::<Uuid>(tx)?;

            let subscription_id = insert_into(subscriptions::table)
                .values(&InsertSubscriptionEntity {
                    user_id: activation.user_id,
                    plan_id: activation.plan_id,
                    start_date: activation.start_date,
                    end_date: activation.end_date,
                    status: SubscriptionStatus::Active.to_string(),
                })
                .returning(subscriptions::id)
                .get_result::<Uuid>(tx)?;

            update(transactions::table)
                .filter(transactions::id.eq(activation.transaction_id))
                .set((
                    transactions::subscription_id.eq(Some(subscription_id)),
                    transactions::updated_at.eq(Utc::now()),
                ))
                .execute(tx)?;

            Ok(ActivationOutcome {
                subscription_id,
                superseded_subscription_id: superseded.into_iter().next(),
                newly_created: true,
            })
        })?;

        Ok(outcome)
    }
}
