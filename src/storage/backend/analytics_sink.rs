//! AnalyticsSink implementation for SeaOrmStorage
//!
//! 每个批次一个事务；每个事件在自己的 savepoint 里执行
//! "clicks + 1" 与分析行插入，单条失败只回滚该 savepoint。

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, ExprTrait,
    QueryFilter, TransactionTrait,
};
use tracing::{debug, warn};

use super::SeaOrmStorage;
use crate::analytics::{AnalyticsEvent, AnalyticsSink, BatchReport};

use migration::entities::{analytics, url};

/// 单个事件的处理结果
enum EventOutcome {
    Applied,
    UnknownCode,
}

#[async_trait]
impl AnalyticsSink for SeaOrmStorage {
    async fn flush_batch(&self, events: Vec<AnalyticsEvent>) -> anyhow::Result<BatchReport> {
        if events.is_empty() {
            return Ok(BatchReport::default());
        }

        let db = &self.db;
        let txn = self.retry.run("flush_batch(begin)", || async {
            db.begin().await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to begin analytics transaction: {}", e))?;

        let mut report = BatchReport::default();
        for event in &events {
            match apply_event(&txn, event).await {
                Ok(EventOutcome::Applied) => report.applied += 1,
                Ok(EventOutcome::UnknownCode) => {
                    report.skipped += 1;
                    warn!(
                        "Skipping click for unknown short code: {}",
                        event.short_code
                    );
                }
                Err(e) => {
                    report.skipped += 1;
                    warn!(
                        "Skipping click for {} after write failure: {}",
                        event.short_code, e
                    );
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to commit analytics batch: {}", e))?;

        debug!(
            "Analytics batch written to {} database ({} applied, {} skipped)",
            self.backend_name.to_uppercase(),
            report.applied,
            report.skipped
        );
        Ok(report)
    }
}

async fn apply_event(
    txn: &DatabaseTransaction,
    event: &AnalyticsEvent,
) -> Result<EventOutcome, DbErr> {
    let savepoint = txn.begin().await?;

    match write_event(&savepoint, event).await {
        Ok(EventOutcome::Applied) => {
            savepoint.commit().await?;
            Ok(EventOutcome::Applied)
        }
        Ok(EventOutcome::UnknownCode) => {
            savepoint.rollback().await?;
            Ok(EventOutcome::UnknownCode)
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

async fn write_event(
    savepoint: &DatabaseTransaction,
    event: &AnalyticsEvent,
) -> Result<EventOutcome, DbErr> {
    let updated = url::Entity::update_many()
        .col_expr(url::Column::Clicks, Expr::col(url::Column::Clicks).add(1))
        .filter(url::Column::ShortCode.eq(event.short_code.as_str()))
        .exec(savepoint)
        .await?;

    if updated.rows_affected == 0 {
        return Ok(EventOutcome::UnknownCode);
    }

    let row = analytics::ActiveModel {
        short_code: Set(event.short_code.clone()),
        ip_address: Set(event.ip_address.clone()),
        user_agent: Set(event.user_agent.clone()),
        timestamp: Set(event.timestamp),
        ..Default::default()
    };
    analytics::Entity::insert(row).exec(savepoint).await?;

    Ok(EventOutcome::Applied)
}
