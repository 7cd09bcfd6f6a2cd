//! 读穿透缓存层
//!
//! 包装具体的 [`ObjectCache`] 后端，统一默认 TTL，并记录命中 / 未命中次数。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::trace;

use super::{CacheResult, ObjectCache};
use crate::storage::UrlRecord;

/// 命中统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct UrlCache {
    backend: Arc<dyn ObjectCache>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl UrlCache {
    pub fn new(backend: Arc<dyn ObjectCache>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, short_code: &str) -> Option<UrlRecord> {
        match self.backend.get(short_code).await {
            CacheResult::Found(record) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!("Cache hit: {}", short_code);
                Some(record)
            }
            CacheResult::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!("Cache miss: {}", short_code);
                None
            }
        }
    }

    pub async fn put(&self, short_code: &str, record: UrlRecord, ttl: Duration) {
        self.backend.insert(short_code, record, ttl).await;
    }

    /// 以默认 TTL 回填
    pub async fn populate(&self, record: &UrlRecord) {
        self.put(&record.short_code, record.clone(), self.default_ttl)
            .await;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
