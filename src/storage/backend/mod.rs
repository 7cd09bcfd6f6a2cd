//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite and PostgreSQL.

mod analytics_sink;
mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::analytics::AnalyticsSink;
use crate::config::DatabaseConfig;
use crate::errors::{Result, SnaplinkError};

pub use connection::{connect_postgres, connect_sqlite, run_migrations};
pub use converters::{model_to_analytics_record, model_to_url_record};

/// 分析记录查询上限
pub const MAX_ANALYTICS_ROWS: u64 = 1000;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Err(SnaplinkError::database_config(
            "MySQL/MariaDB is not supported: the unique index on urls.long_url requires SQLite or PostgreSQL",
        ))
    } else {
        Err(SnaplinkError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported formats: sqlite://, *.db, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry: retry::RetryPolicy,
}

impl SeaOrmStorage {
    pub async fn new(config: &DatabaseConfig, backend_name: &str) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(SnaplinkError::database_config("DATABASE_URL is not set"));
        }

        let retry = retry::RetryPolicy {
            max_retries: config.retry_count,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        };

        let db = match backend_name {
            "sqlite" => connect_sqlite(&config.database_url, config.pool_size).await?,
            "postgres" => connect_postgres(&config.database_url, config.pool_size).await?,
            other => {
                return Err(SnaplinkError::database_config(format!(
                    "Unsupported database backend: {}",
                    other
                )));
            }
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry,
        };

        // 运行迁移
        run_migrations(&storage.db).await?;

        info!(
            "{} storage initialized",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn as_analytics_sink(&self) -> Arc<dyn AnalyticsSink> {
        Arc::new(self.clone()) as Arc<dyn AnalyticsSink>
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://data/links.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("snaplink.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url(":memory:").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("postgres://user:pw@localhost/urls").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/urls").unwrap(),
            "postgres"
        );
    }

    #[test]
    fn test_mysql_is_rejected() {
        let err = infer_backend_from_url("mysql://root@localhost/urls").unwrap_err();
        assert!(matches!(err, SnaplinkError::DatabaseConfig(_)));
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}
