//! URL shortening service
//!
//! shorten / resolve / stats / list 的业务编排，HTTP 层只做参数提取与响应转换。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, warn};

use super::allocator::{CodeAllocator, CodeRegistry};
use crate::analytics::{AnalyticsEvent, AnalyticsPipeline, PipelineStats, RecordOutcome};
use crate::cache::{CacheStats, UrlCache};
use crate::config::{AllocatorConfig, TimeoutConfig};
use crate::errors::{Result, SnaplinkError};
use crate::storage::{AnalyticsRecord, SeaOrmStorage, UrlRecord};
use crate::utils::is_valid_short_code;
use crate::utils::url_validator::{validate_url, validation_error_message};

/// list 默认条数
pub const DEFAULT_LIST_LIMIT: u64 = 50;
/// list 最大条数
pub const MAX_LIST_LIMIT: u64 = 100;

/// 重定向请求携带的客户端信息
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 单个链接的统计
#[derive(Debug, Clone, Serialize)]
pub struct LinkStats {
    #[serde(flatten)]
    pub record: UrlRecord,
    pub analytics: Vec<AnalyticsRecord>,
}

/// 把外部传入的 limit 规范到 (0, 100]
///
/// 缺省、非正数按默认值处理，超过上限截断到上限。
pub fn normalize_list_limit(limit: Option<i64>) -> u64 {
    match limit {
        Some(n) if n > 0 => (n as u64).min(MAX_LIST_LIMIT),
        _ => DEFAULT_LIST_LIMIT,
    }
}

pub struct UrlService {
    storage: Arc<SeaOrmStorage>,
    cache: Arc<UrlCache>,
    pipeline: Arc<AnalyticsPipeline>,
    allocator: CodeAllocator,
    timeouts: TimeoutConfig,
    public_url: String,
}

impl UrlService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        cache: Arc<UrlCache>,
        pipeline: Arc<AnalyticsPipeline>,
        allocator_config: AllocatorConfig,
        timeouts: TimeoutConfig,
        public_url: &str,
    ) -> Self {
        let registry: Arc<dyn CodeRegistry> = storage.clone();
        Self {
            allocator: CodeAllocator::new(registry, allocator_config),
            storage,
            cache,
            pipeline,
            timeouts,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// 替换短码分配器
    pub fn with_allocator(mut self, allocator: CodeAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// 对外可访问的短链接
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/{}", self.public_url, short_code)
    }

    /// 缩短长链接
    ///
    /// 相同的长链接（精确字符串匹配）总是返回同一条记录。
    pub async fn shorten(&self, long_url: &str) -> Result<UrlRecord> {
        if let Err(e) = validate_url(long_url) {
            debug!("Rejected long URL '{}': {}", long_url, e);
            return Err(SnaplinkError::invalid_input(validation_error_message(&e)));
        }

        self.with_deadline("shorten", self.timeouts.request(), self.shorten_inner(long_url))
            .await
    }

    async fn shorten_inner(&self, long_url: &str) -> Result<UrlRecord> {
        if let Some(existing) = self.storage.find_by_long_url(long_url).await? {
            debug!("Long URL already shortened as {}", existing.short_code);
            self.cache.populate(&existing).await;
            return Ok(existing);
        }

        let attempts = self.allocator.policy().insert_attempts.max(1);
        for attempt in 1..=attempts {
            let short_code = self.allocator.allocate().await?;

            match self.storage.insert_url(&short_code, long_url).await {
                Ok(record) => {
                    self.cache.populate(&record).await;
                    return Ok(record);
                }
                Err(SnaplinkError::CodeConflict(_)) => {
                    // 可能是同一长链接被并发缩短，也可能是短码被抢先占用
                    if let Some(existing) = self.storage.find_by_long_url(long_url).await? {
                        debug!(
                            "Concurrent shorten of the same URL resolved to {}",
                            existing.short_code
                        );
                        self.cache.populate(&existing).await;
                        return Ok(existing);
                    }
                    warn!(
                        "Short code '{}' was taken concurrently, reallocating (attempt {}/{})",
                        short_code, attempt, attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        error!("Gave up inserting '{}' after {} conflicts", long_url, attempts);
        Err(SnaplinkError::allocation_exhausted(
            "Short code kept colliding with concurrent writers",
        ))
    }

    /// 解析短码并记录一次点击
    ///
    /// 点击事件只入队，不等待持久化；入队失败不影响返回结果。
    pub async fn resolve(&self, short_code: &str, click: ClickContext) -> Result<UrlRecord> {
        let record = self
            .with_deadline("resolve", self.timeouts.redirect(), self.lookup(short_code))
            .await?;

        let event = AnalyticsEvent::new(short_code).with_client(click.ip_address, click.user_agent);
        if self.pipeline.record(event) == RecordOutcome::Dropped {
            debug!("Click for {} was not recorded", short_code);
        }

        Ok(record)
    }

    /// 读穿透：缓存 → 数据库 → 回填缓存
    async fn lookup(&self, short_code: &str) -> Result<UrlRecord> {
        if !is_valid_short_code(short_code) {
            return Err(not_found(short_code));
        }

        if let Some(record) = self.cache.get(short_code).await {
            return Ok(record);
        }

        match self.storage.find_by_code(short_code).await? {
            Some(record) => {
                self.cache.populate(&record).await;
                Ok(record)
            }
            None => Err(not_found(short_code)),
        }
    }

    /// 点击数直接读数据库，附带最近 1000 条分析记录
    pub async fn stats(&self, short_code: &str) -> Result<LinkStats> {
        self.with_deadline("stats", self.timeouts.request(), async {
            if !is_valid_short_code(short_code) {
                return Err(not_found(short_code));
            }
            let record = self
                .storage
                .find_by_code(short_code)
                .await?
                .ok_or_else(|| not_found(short_code))?;
            let analytics = self.storage.recent_analytics(short_code).await?;
            Ok(LinkStats { record, analytics })
        })
        .await
    }

    /// 最近创建的链接
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<UrlRecord>> {
        let limit = normalize_list_limit(limit);
        self.with_deadline("list", self.timeouts.request(), self.storage.list_recent(limit))
            .await
    }

    pub fn pipeline_stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn with_deadline<T, F>(&self, operation: &str, deadline: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Operation '{}' timed out after {:?}", operation, deadline);
                Err(SnaplinkError::timeout(format!(
                    "{} timed out after {}ms",
                    operation,
                    deadline.as_millis()
                )))
            }
        }
    }
}

fn not_found(short_code: &str) -> SnaplinkError {
    SnaplinkError::not_found(format!("Short code '{}' not found", short_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_list_limit() {
        assert_eq!(normalize_list_limit(None), 50);
        assert_eq!(normalize_list_limit(Some(0)), 50);
        assert_eq!(normalize_list_limit(Some(-5)), 50);
        assert_eq!(normalize_list_limit(Some(1)), 1);
        assert_eq!(normalize_list_limit(Some(100)), 100);
        assert_eq!(normalize_list_limit(Some(101)), 100);
        assert_eq!(normalize_list_limit(Some(i64::MAX)), 100);
    }
}
