use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use crate::cache::{CacheResult, ObjectCache};
use crate::config::RedisConfig;
use crate::errors::{Result, SnaplinkError};
use crate::storage::UrlRecord;

pub struct RedisObjectCache {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护；出错时清空，下次访问重新建立
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
    /// 单次操作超时
    op_timeout: Duration,
}

impl RedisObjectCache {
    /// 创建客户端
    ///
    /// 只校验 URL；连接在首次使用时建立，服务器不可达不会阻止启动。
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.clone()).map_err(|e| {
            SnaplinkError::cache_connection(format!("Invalid Redis URL '{}': {}", config.url, e))
        })?;

        debug!(
            "RedisObjectCache created with prefix: '{}', timeout: {}ms",
            config.key_prefix, config.timeout_ms
        );

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: config.key_prefix.clone(),
            op_timeout: Duration::from_millis(config.timeout_ms.max(1)),
        })
    }

    /// 启动时探测连通性，失败只影响日志
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self
            .get_connection()
            .await
            .map_err(|e| SnaplinkError::cache_connection(e.to_string()))?;
        let response = self
            .with_timeout(redis::cmd("PING").query_async::<String>(&mut conn))
            .await
            .map_err(|e| SnaplinkError::cache_connection(e.to_string()))?;
        debug!("Redis connection test successful: {}", response);
        Ok(())
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        // 首先尝试读取现有连接
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        // 需要建立新连接
        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self
            .with_timeout(self.client.get_multiplexed_async_connection())
            .await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    /// 超时视为 IO 错误，走与断线相同的降级路径
    async fn with_timeout<T, F>(&self, fut: F) -> redis::RedisResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(redis::RedisError::from(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("redis operation timed out after {:?}", self.op_timeout),
            ))),
        }
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl ObjectCache for RedisObjectCache {
    async fn get(&self, key: &str) -> CacheResult {
        let redis_key = self.make_key(key);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return CacheResult::Miss;
            }
        };

        let result: redis::RedisResult<Option<String>> =
            self.with_timeout(conn.get(&redis_key)).await;

        match result {
            Ok(Some(data)) => match serde_json::from_str::<UrlRecord>(&data) {
                Ok(record) => {
                    trace!("Successfully retrieved key: {}", key);
                    CacheResult::Found(record)
                }
                Err(e) => {
                    // 损坏的条目按未命中处理，回源后会被覆盖
                    error!("Failed to deserialize cached record for key '{}': {}", key, e);
                    CacheResult::Miss
                }
            },
            Ok(None) => {
                trace!("Key not found in cache: {}", key);
                CacheResult::Miss
            }
            Err(e) => {
                error!("Failed to get key '{}': {}", key, e);
                // 连接可能已断开，重置连接
                self.reset_connection().await;
                CacheResult::Miss
            }
        }
    }

    async fn insert(&self, key: &str, value: UrlRecord, ttl: Duration) {
        let redis_key = self.make_key(key);

        let serialized = match serde_json::to_string(&value) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to serialize record for key '{}': {}", key, e);
                return;
            }
        };

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        let ttl_secs = ttl.as_secs().max(1);
        match self
            .with_timeout(conn.set_ex::<String, String, ()>(redis_key, serialized, ttl_secs))
            .await
        {
            Ok(_) => trace!("Successfully inserted key into cache: {}", key),
            Err(e) => {
                error!("Failed to insert key '{}' into cache: {}", key, e);
                self.reset_connection().await;
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
