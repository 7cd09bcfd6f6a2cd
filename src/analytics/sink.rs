use super::AnalyticsEvent;

/// 一次批量刷盘的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 计数已加一且分析行已写入的事件数
    pub applied: usize,
    /// 单条失败被跳过的事件数（如短码不存在）
    pub skipped: usize,
}

/// 点击事件持久化 Sink
///
/// 一个批次对应一次事务：单条事件失败只跳过该条；
/// 返回 `Err` 表示整批未提交，批内数据全部丢失。
#[async_trait::async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn flush_batch(&self, events: Vec<AnalyticsEvent>) -> anyhow::Result<BatchReport>;
}
