use std::{sync::Arc, time::Duration};

use anyhow::Result;
use crates::domain::{
    entities::plans::PlanEntity,
    repositories::{cache::CacheRepository, plans::PlanRepository},
    value_objects::pagination::{PageRequest, Paginated, Pagination},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use uuid::Uuid;

pub const PLAN_LIST_CACHE_PREFIX: &str = "plans:list";

pub fn plan_cache_key(plan_id: Uuid) -> String {
    format!("plan:{plan_id}")
}

fn plan_list_cache_key(page: PageRequest, include_inactive: bool) -> String {
    format!(
        "{PLAN_LIST_CACHE_PREFIX}:{include_inactive}:{}:{}",
        page.page, page.limit
    )
}

/// Read-through plan lookups. The cache is advisory: every failure falls
/// back to the store and nothing here depends on a hit.
pub struct PlanCatalog<P, C>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<P, C> PlanCatalog<P, C>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    pub fn new(plan_repo: Arc<P>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            plan_repo,
            cache,
            ttl,
        }
    }

    pub async fn get(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        let key = plan_cache_key(plan_id);
        if let Some(plan) = self.read_cached::<PlanEntity>(&key).await {
            return Ok(Some(plan));
        }

        let plan = self.plan_repo.find_by_id(plan_id).await?;
        if let Some(plan) = &plan {
            self.write_cached(&key, plan).await;
        }

        Ok(plan)
    }

    pub async fn list(
        &self,
        page: PageRequest,
        include_inactive: bool,
    ) -> Result<Paginated<PlanEntity>> {
        let key = plan_list_cache_key(page, include_inactive);
        if let Some(cached) = self.read_cached::<Paginated<PlanEntity>>(&key).await {
            return Ok(cached);
        }

        let total = self.plan_repo.count(include_inactive).await?;
        let items = self
            .plan_repo
            .list(page.limit, page.offset(), include_inactive)
            .await?;

        let result = Paginated {
            items,
            pagination: Pagination::new(page, total),
        };
        self.write_cached(&key, &result).await;

        Ok(result)
    }

    /// Drops the plan entry (when given) and every cached listing.
    pub async fn invalidate(&self, plan_id: Option<Uuid>) {
        if let Some(plan_id) = plan_id {
            if let Err(err) = self.cache.delete(&plan_cache_key(plan_id)).await {
                warn!(%plan_id, cache_error = ?err, "plan_catalog: failed to invalidate plan");
            }
        }

        if let Err(err) = self.cache.delete_by_prefix(PLAN_LIST_CACHE_PREFIX).await {
            warn!(cache_error = ?err, "plan_catalog: failed to invalidate plan listings");
        }
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "plan_catalog: cache hit");
                    Some(value)
                }
                Err(err) => {
                    warn!(key, decode_error = %err, "plan_catalog: discarding corrupt cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, cache_error = ?err, "plan_catalog: cache read failed");
                None
            }
        }
    }

    async fn write_cached<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, encode_error = %err, "plan_catalog: failed to encode cache entry");
                return;
            }
        };

        if let Err(err) = self.cache.set(key, raw, self.ttl).await {
            warn!(key, cache_error = ?err, "plan_catalog: cache write failed");
        }
    }
}
