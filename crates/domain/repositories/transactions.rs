use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::transactions::{
    InsertTransactionEntity, ReconcileTransactionEntity, TransactionEntity,
};

#[automock]
#[async_trait]
pub trait TransactionRepository {
    async fn insert(
        &self,
        insert_transaction_entity: InsertTransactionEntity,
    ) -> Result<TransactionEntity>;

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<TransactionEntity>>;

    /// Newest first.
    async fn list_by_user_id(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionEntity>>;

    async fn count_by_user_id(&self, user_id: Uuid) -> Result<i64>;

    /// Applies the changes only while the stored status is not terminal.
    /// Returns `None` when the guard rejected the write.
    async fn apply_reconciliation(
        &self,
        transaction_id: Uuid,
        changes: ReconcileTransactionEntity,
    ) -> Result<Option<TransactionEntity>>;
}
