//! Mutation operations for SeaOrmStorage
//!
//! 点击计数只由分析管道修改（见 `analytics_sink`），这里只负责创建链接。

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::model_to_url_record;
use super::retry;
use crate::errors::{Result, SnaplinkError};
use crate::storage::UrlRecord;

use migration::entities::url;

impl SeaOrmStorage {
    /// 插入新链接
    ///
    /// 唯一约束冲突（short_code 或 long_url）返回 `CodeConflict`，
    /// 由调用方决定是复用已有记录还是重新分配短码。
    pub async fn insert_url(&self, short_code: &str, long_url: &str) -> Result<UrlRecord> {
        let db = &self.db;
        let created_at = Utc::now();

        let operation = format!("insert_url({})", short_code);
        let result = self.retry.run(&operation, || async {
            url::ActiveModel {
                short_code: Set(short_code.to_string()),
                long_url: Set(long_url.to_string()),
                clicks: Set(0),
                created_at: Set(created_at),
                ..Default::default()
            }
            .insert(db)
            .await
        })
        .await;

        match result {
            Ok(model) => {
                info!("Short link created: {} -> {}", model.short_code, model.long_url);
                Ok(model_to_url_record(model))
            }
            Err(e) if retry::is_unique_violation(&e) => {
                debug!(
                    "Unique constraint violated while inserting {}: {}",
                    short_code, e
                );
                Err(SnaplinkError::code_conflict(format!(
                    "Short code or URL already exists: {}",
                    short_code
                )))
            }
            Err(e) => Err(SnaplinkError::database_operation(format!(
                "Failed to insert short link: {}",
                e
            ))),
        }
    }
}
