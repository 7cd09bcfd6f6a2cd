use crate::storage::{AnalyticsRecord, UrlRecord};
use migration::entities::{analytics, url};

/// 将 Sea-ORM Model 转换为 UrlRecord
pub fn model_to_url_record(model: url::Model) -> UrlRecord {
    UrlRecord {
        id: model.id,
        short_code: model.short_code,
        long_url: model.long_url,
        clicks: model.clicks.max(0),
        created_at: model.created_at,
    }
}

pub fn model_to_analytics_record(model: analytics::Model) -> AnalyticsRecord {
    AnalyticsRecord {
        id: model.id,
        short_code: model.short_code,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        timestamp: model.timestamp,
    }
}
