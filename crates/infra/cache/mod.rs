pub mod noop_cache;
pub mod redis_cache;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::domain::repositories::cache::CacheRepository;
use noop_cache::NoopCache;
use redis_cache::RedisCache;

/// Cache selected at startup from configuration.
#[derive(Clone)]
pub enum AppCache {
    Redis(RedisCache),
    Disabled(NoopCache),
}

impl AppCache {
    pub async fn from_url(redis_url: Option<&str>) -> Result<Arc<Self>> {
        match redis_url {
            Some(url) => {
                let cache = RedisCache::connect(url).await?;
                info!("cache: redis connection has been established");
                Ok(Arc::new(AppCache::Redis(cache)))
            }
            None => {
                info!("cache: REDIS_URL not set, plan cache disabled");
                Ok(Arc::new(AppCache::Disabled(NoopCache)))
            }
        }
    }
}

#[async_trait]
impl CacheRepository for AppCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            AppCache::Redis(cache) => cache.get(key).await,
            AppCache::Disabled(cache) => cache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        match self {
            AppCache::Redis(cache) => cache.set(key, value, ttl).await,
            AppCache::Disabled(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            AppCache::Redis(cache) => cache.delete(key).await,
            AppCache::Disabled(cache) => cache.delete(key).await,
        }
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        match self {
            AppCache::Redis(cache) => cache.delete_by_prefix(prefix).await,
            AppCache::Disabled(cache) => cache.delete_by_prefix(prefix).await,
        }
    }
}
