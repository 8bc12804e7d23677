use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// Advisory key/value cache. Callers must behave identically when every
/// call misses or fails.
#[automock]
#[async_trait]
pub trait CacheRepository {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Deletes every key starting with `prefix`.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<()>;
}
