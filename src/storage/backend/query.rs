//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::error;

use super::{MAX_ANALYTICS_ROWS, SeaOrmStorage};
use super::converters::{model_to_analytics_record, model_to_url_record};
use crate::errors::{Result, SnaplinkError};
use crate::services::CodeRegistry;
use crate::storage::{AnalyticsRecord, UrlRecord};

use migration::entities::{analytics, url};

impl SeaOrmStorage {
    /// 按短码查询
    pub async fn find_by_code(&self, code: &str) -> Result<Option<UrlRecord>> {
        let db = &self.db;

        let operation = format!("find_by_code({})", code);
        let result = self.retry.run(&operation, || async {
            url::Entity::find()
                .filter(url::Column::ShortCode.eq(code))
                .one(db)
                .await
        })
        .await;

        match result {
            Ok(model) => Ok(model.map(model_to_url_record)),
            Err(e) => {
                error!("Failed to query short code (after retries): {}", e);
                Err(SnaplinkError::database_operation(format!(
                    "Failed to query short code: {}",
                    e
                )))
            }
        }
    }

    /// 按长链接精确匹配查询（幂等缩短）
    pub async fn find_by_long_url(&self, long_url: &str) -> Result<Option<UrlRecord>> {
        let db = &self.db;

        self.retry.run("find_by_long_url", || async {
            url::Entity::find()
                .filter(url::Column::LongUrl.eq(long_url))
                .one(db)
                .await
        })
        .await
        .map(|model| model.map(model_to_url_record))
        .map_err(|e| {
            error!("Failed to query long URL (after retries): {}", e);
            SnaplinkError::database_operation(format!("Failed to query long URL: {}", e))
        })
    }

    /// 短码是否已被占用
    pub async fn code_exists(&self, code: &str) -> Result<bool> {
        let db = &self.db;

        let operation = format!("code_exists({})", code);
        let count = self.retry.run(&operation, || async {
            url::Entity::find()
                .filter(url::Column::ShortCode.eq(code))
                .count(db)
                .await
        })
        .await
        .map_err(|e| {
            SnaplinkError::database_operation(format!("Failed to check short code: {}", e))
        })?;

        Ok(count > 0)
    }

    /// 最近创建的链接，按创建时间倒序
    pub async fn list_recent(&self, limit: u64) -> Result<Vec<UrlRecord>> {
        let db = &self.db;

        let models = self.retry.run("list_recent", || async {
            url::Entity::find()
                .order_by_desc(url::Column::CreatedAt)
                .order_by_desc(url::Column::Id)
                .limit(limit)
                .all(db)
                .await
        })
        .await
        .map_err(|e| {
            error!("Failed to list URLs (after retries): {}", e);
            SnaplinkError::database_operation(format!("Failed to list URLs: {}", e))
        })?;

        Ok(models.into_iter().map(model_to_url_record).collect())
    }

    /// 指定短码最近的分析记录，新的在前，最多 1000 条
    pub async fn recent_analytics(&self, code: &str) -> Result<Vec<AnalyticsRecord>> {
        let db = &self.db;

        let operation = format!("recent_analytics({})", code);
        let models = self.retry.run(&operation, || async {
            analytics::Entity::find()
                .filter(analytics::Column::ShortCode.eq(code))
                .order_by_desc(analytics::Column::Timestamp)
                .order_by_desc(analytics::Column::Id)
                .limit(MAX_ANALYTICS_ROWS)
                .all(db)
                .await
        })
        .await
        .map_err(|e| {
            SnaplinkError::database_operation(format!("Failed to query analytics: {}", e))
        })?;

        Ok(models.into_iter().map(model_to_analytics_record).collect())
    }

    /// 链接总数
    pub async fn count_urls(&self) -> Result<u64> {
        url::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| SnaplinkError::database_operation(format!("Failed to count URLs: {}", e)))
    }
}

#[async_trait]
impl CodeRegistry for SeaOrmStorage {
    async fn code_exists(&self, code: &str) -> Result<bool> {
        SeaOrmStorage::code_exists(self, code).await
    }
}
