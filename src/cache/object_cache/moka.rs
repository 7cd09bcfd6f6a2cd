use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use tracing::debug;

use crate::cache::{CacheResult, ObjectCache};
use crate::storage::UrlRecord;

/// 缓存条目：记录本身 + 写入时指定的 TTL
#[derive(Clone)]
struct CachedRecord {
    record: UrlRecord,
    ttl: Duration,
}

/// 按条目自带的 TTL 过期
struct PerEntryExpiry;

impl Expiry<String, CachedRecord> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedRecord,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 进程内缓存（moka）
pub struct MokaCacheWrapper {
    inner: Cache<String, CachedRecord>,
}

impl MokaCacheWrapper {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .build();

        debug!(
            "MokaCacheWrapper initialized with max capacity: {}",
            max_capacity
        );
        Self { inner }
    }
}

#[async_trait]
impl ObjectCache for MokaCacheWrapper {
    async fn get(&self, key: &str) -> CacheResult {
        match self.inner.get(key).await {
            Some(entry) => CacheResult::Found(entry.record),
            None => CacheResult::Miss,
        }
    }

    async fn insert(&self, key: &str, value: UrlRecord, ttl: Duration) {
        self.inner
            .insert(key.to_string(), CachedRecord { record: value, ttl })
            .await;
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str) -> UrlRecord {
        UrlRecord {
            id: 1,
            short_code: code.to_string(),
            long_url: format!("https://example.com/{}", code),
            clicks: 0,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = MokaCacheWrapper::new(100);
        cache
            .insert("abc123", record("abc123"), Duration::from_secs(60))
            .await;

        match cache.get("abc123").await {
            CacheResult::Found(found) => assert_eq!(found.long_url, "https://example.com/abc123"),
            CacheResult::Miss => panic!("expected cache hit"),
        }
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = MokaCacheWrapper::new(100);
        cache
            .insert("short", record("short"), Duration::from_millis(50))
            .await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(matches!(cache.get("short").await, CacheResult::Miss));
    }
}
