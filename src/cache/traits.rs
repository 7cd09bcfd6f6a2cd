use std::time::Duration;

use async_trait::async_trait;

use crate::storage::UrlRecord;

/// 缓存查询结果
#[derive(Debug, Clone)]
pub enum CacheResult {
    /// 成功获取到缓存值
    Found(UrlRecord),
    /// 未命中（包括后端不可用、条目损坏）
    Miss,
}

/// 短码 → 链接记录的对象缓存后端
///
/// 实现方不得向调用方返回错误：后端故障一律降级为 `Miss` / 空操作并记录日志。
#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult;
    async fn insert(&self, key: &str, value: UrlRecord, ttl: Duration);

    fn backend_name(&self) -> &'static str;
}
