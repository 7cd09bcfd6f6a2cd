use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::cache::{CacheResult, ObjectCache};
use crate::storage::UrlRecord;

/// `cache.type = "none"`：所有查询都未命中
pub struct NullObjectCache;

impl NullObjectCache {
    pub fn new() -> Self {
        trace!("Using NullObjectCache: every lookup goes to the database");
        NullObjectCache
    }
}

impl Default for NullObjectCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectCache for NullObjectCache {
    async fn get(&self, key: &str) -> CacheResult {
        trace!("NullObjectCache.get called for key: {}", key);
        CacheResult::Miss
    }

    async fn insert(&self, key: &str, _: UrlRecord, _ttl: Duration) {
        trace!("NullObjectCache.insert called for key: {}", key);
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(code: &str) -> UrlRecord {
        UrlRecord {
            id: 1,
            short_code: code.to_string(),
            long_url: "https://example.com".to_string(),
            clicks: 0,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_null_cache_get_always_returns_miss() {
        let cache = NullObjectCache::new();

        assert!(matches!(cache.get("any_key").await, CacheResult::Miss));
        assert!(matches!(cache.get("").await, CacheResult::Miss));
    }

    #[tokio::test]
    async fn test_null_cache_insert_is_noop() {
        let cache = NullObjectCache::new();
        cache
            .insert("test", create_test_record("test"), Duration::from_secs(3600))
            .await;

        // 插入后 get 仍然返回 Miss
        assert!(matches!(cache.get("test").await, CacheResult::Miss));
    }
}
