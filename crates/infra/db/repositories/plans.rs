use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::plans};
use domain::{
    entities::plans::{InsertPlanEntity, PlanChangeset, PlanEntity, PlanRow},
    repositories::plans::PlanRepository,
};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = plans::table
            .filter(plans::id.eq(plan_id))
            .filter(plans::deleted_at.is_null())
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?;

        Ok(row.map(PlanEntity::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = plans::table
            .filter(plans::name.eq(name))
            .filter(plans::deleted_at.is_null())
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?;

        Ok(row.map(PlanEntity::from))
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
        include_inactive: bool,
    ) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = plans::table
            .filter(plans::deleted_at.is_null())
            .select(PlanRow::as_select())
            .into_boxed();

        if !include_inactive {
            query = query.filter(plans::is_active.eq(true));
        }

        let rows = query
            .order((plans::price.asc(), plans::name.asc()))
            .limit(limit)
            .offset(offset)
            .load::<PlanRow>(&mut conn)?;

        Ok(rows.into_iter().map(PlanEntity::from).collect())
    }

    async fn count(&self, include_inactive: bool) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = plans::table
            .filter(plans::deleted_at.is_null())
            .count()
            .into_boxed();

        if !include_inactive {
            query = query.filter(plans::is_active.eq(true));
        }

        Ok(query.get_result::<i64>(&mut conn)?)
    }

    async fn insert(&self, insert_plan_entity: InsertPlanEntity) -> Result<PlanEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = insert_into(plans::table)
            .values(&insert_plan_entity)
            .returning(PlanRow::as_returning())
            .get_result::<PlanRow>(&mut conn)?;

        Ok(row.into())
    }

    async fn update(&self, plan_id: Uuid, changeset: PlanChangeset) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = update(plans::table)
            .filter(plans::id.eq(plan_id))
            .filter(plans::deleted_at.is_null())
            .set(&changeset)
            .returning(PlanRow::as_returning())
            .get_result::<PlanRow>(&mut conn)
            .optional()?;

        Ok(row.map(PlanEntity::from))
    }

    async fn soft_delete(&self, plan_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(plans::table)
            .filter(plans::id.eq(plan_id))
            .filter(plans::deleted_at.is_null())
            .set(plans::deleted_at.eq(Some(Utc::now())))
            .execute(&mut conn)?;

        Ok(affected > 0)
    }
}
