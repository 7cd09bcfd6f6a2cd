use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、端口、对外短链前缀
/// - database: 数据库连接与重试
/// - cache: 缓存后端（redis / memory / none）
/// - logging: 日志
/// - analytics: 点击分析管道
/// - allocator: 短码分配策略
/// - timeouts: 请求超时
///
/// 配置在启动时加载一次，显式传入各组件构造函数。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub allocator: AllocatorConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：传统环境变量 > SL__ 环境变量 > config.toml > 默认值
    /// ENV 前缀：SL，分隔符：__
    /// 示例：SL__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 SL，分隔符 __
            .add_source(
                Environment::with_prefix("SL")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        };

        config.apply_legacy_env(|key| std::env::var(key).ok());
        config
    }

    /// 兼容部署脚本中常见的环境变量：DATABASE_URL / REDIS_ADDR / REDIS_URL / PORT
    pub fn apply_legacy_env<F>(&mut self, get_var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get_var("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.database_url = url;
        }

        let redis_url = get_var("REDIS_URL")
            .filter(|v| !v.is_empty())
            .or_else(|| {
                get_var("REDIS_ADDR")
                    .filter(|v| !v.is_empty())
                    .map(|addr| format!("redis://{}/", addr))
            });
        if let Some(url) = redis_url {
            self.cache.redis.url = url;
            self.cache.cache_type = "redis".to_string();
        }

        if let Some(port) = get_var("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 拼接 short_url 使用的对外地址
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 缓存系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    #[serde(default = "default_cache_type")]
    pub cache_type: String,
    /// 缓存条目过期时间（秒）
    #[serde(default = "default_cache_ttl")]
    pub default_ttl: u64,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
    /// 单次 Redis 操作超时（毫秒），超时按未命中处理
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_capacity")]
    pub max_capacity: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 点击分析管道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// 入队缓冲区容量，满了直接丢弃
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// 批量刷盘阈值
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 定时刷盘间隔（毫秒）
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// 关闭时最终刷盘的超时（秒）
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

/// 短码分配策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AllocatorConfig {
    #[serde(default = "default_start_length")]
    pub start_length: usize,
    /// 起始长度之后最多再加长几轮
    #[serde(default = "default_extra_lengths")]
    pub extra_lengths: usize,
    #[serde(default = "default_attempts_per_length")]
    pub attempts_per_length: usize,
    /// 插入时遇到短码冲突后重新分配的次数
    #[serde(default = "default_insert_attempts")]
    pub insert_attempts: usize,
}

/// 请求超时配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_redirect_timeout_ms")]
    pub redirect_ms: u64,
    /// shorten / stats / list
    #[serde(default = "default_request_timeout_ms")]
    pub request_ms: u64,
}

impl TimeoutConfig {
    pub fn redirect(&self) -> Duration {
        Duration::from_millis(self.redirect_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "snaplink.db".to_string()
}

fn default_database_pool_size() -> u32 {
    50
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_cache_type() -> String {
    "memory".to_string()
}

fn default_cache_ttl() -> u64 {
    24 * 60 * 60
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "snaplink:".to_string()
}

fn default_redis_timeout_ms() -> u64 {
    500
}

fn default_memory_capacity() -> u64 {
    10000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_batch_size() -> usize {
    50
}

fn default_flush_interval_ms() -> u64 {
    100
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_start_length() -> usize {
    6
}

fn default_extra_lengths() -> usize {
    2
}

fn default_attempts_per_length() -> usize {
    10
}

fn default_insert_attempts() -> usize {
    3
}

fn default_redirect_timeout_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            public_url: default_public_url(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: default_cache_type(),
            default_ttl: default_cache_ttl(),
            redis: RedisConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_memory_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            start_length: default_start_length(),
            extra_lengths: default_extra_lengths(),
            attempts_per_length: default_attempts_per_length(),
            insert_attempts: default_insert_attempts(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            redirect_ms: default_redirect_timeout_ms(),
            request_ms: default_request_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = StaticConfig::default();
        assert_eq!(config.cache.default_ttl, 86400);
        assert_eq!(config.analytics.queue_capacity, 1000);
        assert_eq!(config.analytics.batch_size, 50);
        assert_eq!(config.analytics.flush_interval_ms, 100);
        assert_eq!(config.allocator.start_length, 6);
        assert_eq!(config.allocator.extra_lengths, 2);
        assert_eq!(config.allocator.attempts_per_length, 10);
        assert_eq!(config.timeouts.redirect(), Duration::from_secs(2));
        assert_eq!(config.timeouts.request(), Duration::from_secs(5));
    }

    #[test]
    fn test_legacy_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://user:pw@db/urls"),
            ("REDIS_ADDR", "cache:6379"),
            ("PORT", "9090"),
        ]
        .into_iter()
        .collect();

        let mut config = StaticConfig::default();
        config.apply_legacy_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.database_url, "postgres://user:pw@db/urls");
        assert_eq!(config.cache.redis.url, "redis://cache:6379/");
        assert_eq!(config.cache.cache_type, "redis");
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_legacy_env_ignores_invalid_port() {
        let mut config = StaticConfig::default();
        config.apply_legacy_env(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.cache_type, "memory");
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).expect("sample config should parse");
        assert_eq!(parsed.analytics.batch_size, 50);
        assert_eq!(parsed.server.public_url, "http://localhost:8080");
    }
}
