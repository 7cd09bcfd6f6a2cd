//! 数据库错误分类与退避重试
//!
//! 瞬时故障（连接池耗尽、连接断开、SQLite BUSY/LOCKED、PostgreSQL 序列化失败 / 死锁 / 锁等待）
//! 按退避策略重试。唯一约束冲突原样交还调用方，由短码分配流程决定如何处理。

use std::future::Future;
use std::time::Duration;

use sea_orm::error::RuntimeErr;
use sea_orm::sqlx::error::DatabaseError;
use sea_orm::sqlx::sqlite::SqliteError;
use sea_orm::{DbErr, SqlErr};
use tracing::{debug, warn};

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// PostgreSQL: serialization_failure, deadlock_detected, lock_not_available
const PG_TRANSIENT_STATES: &[&str] = &["40001", "40P01", "55P03"];

/// 数据库错误的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// 稍后重试可能成功
    Transient,
    /// `urls.short_code` 或 `urls.long_url` 已存在
    UniqueViolation,
    /// 重试无意义
    Permanent,
}

pub fn classify(err: &DbErr) -> Failure {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return Failure::UniqueViolation;
    }

    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Failure::Transient,
        DbErr::Exec(RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx_err)) => match sqlx_err.as_database_error() {
            Some(db_err) if is_transient_database_error(db_err) => Failure::Transient,
            _ => Failure::Permanent,
        },
        _ => Failure::Permanent,
    }
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    classify(err) == Failure::UniqueViolation
}

fn is_transient_database_error(db_err: &(dyn DatabaseError + 'static)) -> bool {
    let Some(code) = db_err.code() else {
        return false;
    };

    if db_err.try_downcast_ref::<SqliteError>().is_some() {
        // 扩展错误码的低 8 位是主错误码（如 SQLITE_BUSY_SNAPSHOT = 517）
        code.parse::<i32>()
            .is_ok_and(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
    } else {
        PG_TRANSIENT_STATES.iter().any(|state| *state == code)
    }
}

/// 重试策略：首次执行之外最多 `max_retries` 次，延迟按 2 的幂增长并封顶
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// 第 `retry` 次重试前的等待时间，落在 [上限的一半, 上限] 之间
    fn delay_for(&self, retry: u32) -> Duration {
        let ceiling = self
            .base_delay
            .saturating_mul(1u32 << retry.saturating_sub(1).min(16))
            .min(self.max_delay);
        let half = ceiling / 2;
        let spread = (ceiling - half).as_millis() as u64;
        half + Duration::from_millis(rand::random_range(0..=spread))
    }

    /// 执行 `op`，瞬时故障时退避重试，其余错误立即返回
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, DbErr>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        let mut retries = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if classify(&err) != Failure::Transient {
                return Err(err);
            }
            if retries >= self.max_retries {
                warn!("{} still failing after {} retries: {}", label, retries, err);
                return Err(err);
            }

            retries += 1;
            let delay = self.delay_for(retries);
            debug!(
                "{} hit a transient database error ({}), retry {} in {:?}",
                label, err, retries, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
