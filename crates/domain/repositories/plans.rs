use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::plans::{InsertPlanEntity, PlanChangeset, PlanEntity};

/// Soft-deleted plans are invisible to every method.
#[automock]
#[async_trait]
pub trait PlanRepository {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<PlanEntity>>;
    async fn list(&self, limit: i64, offset: i64, include_inactive: bool)
    -> Result<Vec<PlanEntity>>;
    async fn count(&self, include_inactive: bool) -> Result<i64>;
    async fn insert(&self, insert_plan_entity: InsertPlanEntity) -> Result<PlanEntity>;
    async fn update(&self, plan_id: Uuid, changeset: PlanChangeset)
    -> Result<Option<PlanEntity>>;
    /// Returns false when no live plan had that id.
    async fn soft_delete(&self, plan_id: Uuid) -> Result<bool>;
}
