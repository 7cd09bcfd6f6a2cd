//! 点击分析采集
//!
//! 重定向路径只负责把 [`AnalyticsEvent`] 非阻塞地放进有界队列，
//! 由 [`AnalyticsPipeline`] 的唯一后台 worker 批量写入 [`AnalyticsSink`]。

pub mod pipeline;
pub mod sink;

pub use pipeline::{AnalyticsPipeline, PipelineStats, RecordOutcome};
pub use sink::{AnalyticsSink, BatchReport};

use chrono::{DateTime, Utc};

/// 单次成功重定向产生的点击事件
#[derive(Debug, Clone)]
pub struct AnalyticsEvent {
    /// 短码（逻辑外键，不做强制约束）
    pub short_code: String,
    /// 客户端 IP 地址
    pub ip_address: Option<String>,
    /// 用户代理 (User-Agent header)
    pub user_agent: Option<String>,
    /// 点击时间戳
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(short_code: impl Into<String>) -> Self {
        Self {
            short_code: short_code.into(),
            ip_address: None,
            user_agent: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}
