use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::transactions},
};
use domain::{
    entities::transactions::{
        InsertTransactionEntity, ReconcileTransactionEntity, TransactionEntity,
    },
    repositories::transactions::TransactionRepository,
    value_objects::enums::transaction_statuses::TransactionStatus,
};

pub struct TransactionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TransactionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TransactionRepository for TransactionPostgres {
    async fn insert(
        &self,
        insert_transaction_entity: InsertTransactionEntity,
    ) -> Result<TransactionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(transactions::table)
            .values(&insert_transaction_entity)
            .returning(TransactionEntity::as_returning())
            .get_result::<TransactionEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = transactions::table
            .filter(transactions::id.eq(transaction_id))
            .filter(transactions::deleted_at.is_null())
            .select(TransactionEntity::as_select())
            .first::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = transactions::table
            .filter(transactions::order_id.eq(order_id))
            .filter(transactions::deleted_at.is_null())
            .select(TransactionEntity::as_select())
            .first::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_by_user_id(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::deleted_at.is_null())
            .order(transactions::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(TransactionEntity::as_select())
            .load::<TransactionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_by_user_id(&self, user_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::deleted_at.is_null())
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(total)
    }

    async fn apply_reconciliation(
        &self,
        transaction_id: Uuid,
        changes: ReconcileTransactionEntity,
    ) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let terminal = vec![
            TransactionStatus::Success.to_string(),
            TransactionStatus::Failed.to_string(),
        ];

        let result = update(transactions::table)
            .filter(transactions::id.eq(transaction_id))
            .filter(transactions::status.ne_all(terminal))
            .set(&changes)
            .returning(TransactionEntity::as_returning())
            .get_result::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
