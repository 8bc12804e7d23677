use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::usage},
};
use domain::{
    entities::usages::{InsertUsageEntity, UsageEntity},
    repositories::usages::UsageRepository,
    value_objects::{enums::features::Feature, plans::Limit},
};

pub struct UsagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UsagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UsageRepository for UsagePostgres {
    async fn find_or_create(
        &self,
        user_id: Uuid,
        feature: Feature,
        period_month: NaiveDate,
    ) -> Result<UsageEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(usage::table)
            .values(&InsertUsageEntity {
                user_id,
                feature: feature.to_string(),
                period_month,
                count: 0,
            })
            .on_conflict((usage::user_id, usage::feature, usage::period_month))
            .do_nothing()
            .execute(&mut conn)?;

        let row = usage::table
            .filter(usage::user_id.eq(user_id))
            .filter(usage::feature.eq(feature.as_str()))
            .filter(usage::period_month.eq(period_month))
            .select(UsageEntity::as_select())
            .first::<UsageEntity>(&mut conn)?;

        Ok(row)
    }

    async fn increment_within_limit(
        &self,
        user_id: Uuid,
        feature: Feature,
        period_month: NaiveDate,
        limit: Limit,
    ) -> Result<Option<i32>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let target = usage::table
            .filter(usage::user_id.eq(user_id))
            .filter(usage::feature.eq(feature.as_str()))
            .filter(usage::period_month.eq(period_month));

        let count = match limit {
            Limit::Unlimited => update(target)
                .set(usage::count.eq(usage::count + 1))
                .returning(usage::count)
                .get_result::<i32>(&mut conn)
                .optional()?,
            Limit::Capped(max) => update(target.filter(usage::count.lt(max)))
                .set(usage::count.eq(usage::count + 1))
                .returning(usage::count)
                .get_result::<i32>(&mut conn)
                .optional()?,
        };

        Ok(count)
    }
}
