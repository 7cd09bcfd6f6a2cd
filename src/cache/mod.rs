pub mod layer;
pub mod object_cache;
pub mod traits;

use std::sync::Arc;

use tracing::{info, warn};

pub use layer::{CacheStats, UrlCache};
pub use traits::{CacheResult, ObjectCache};

use crate::config::CacheConfig;
use crate::errors::{Result, SnaplinkError};
use object_cache::{MokaCacheWrapper, NullObjectCache, RedisObjectCache};

/// 按 `cache.type` 构造缓存层
///
/// Redis 不可达只记录警告，运行期会自动重连，期间所有查询回源数据库。
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<UrlCache>> {
    let backend: Arc<dyn ObjectCache> = match config.cache_type.as_str() {
        "redis" => {
            let redis = RedisObjectCache::new(&config.redis)?;
            if let Err(e) = redis.ping().await {
                warn!(
                    "Redis at {} is unreachable ({}), continuing with database fallback",
                    config.redis.url, e
                );
            }
            Arc::new(redis)
        }
        "memory" => Arc::new(MokaCacheWrapper::new(config.memory.max_capacity)),
        "none" | "null" => Arc::new(NullObjectCache::new()),
        other => {
            return Err(SnaplinkError::cache_connection(format!(
                "Unknown cache type '{}', expected redis, memory or none",
                other
            )));
        }
    };

    info!(
        "Cache initialized: {} (ttl: {}s)",
        backend.backend_name(),
        config.default_ttl
    );
    Ok(Arc::new(UrlCache::new(backend, config.ttl())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_by_type() {
        let mut config = CacheConfig::default();
        assert_eq!(create_cache(&config).await.unwrap().backend_name(), "memory");

        config.cache_type = "none".to_string();
        assert_eq!(create_cache(&config).await.unwrap().backend_name(), "none");

        config.cache_type = "memcached".to_string();
        assert!(create_cache(&config).await.is_err());
    }
}
