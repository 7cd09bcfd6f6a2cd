use crate::analytics::AnalyticsPipeline;
use crate::cache::{self, UrlCache};
use crate::config::StaticConfig;
use crate::services::UrlService;
use crate::storage::StorageFactory;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// 服务运行所需的共享对象，启动时显式构造后注入各处
pub struct StartupContext {
    pub cache: Arc<UrlCache>,
    pub pipeline: Arc<AnalyticsPipeline>,
    pub url_service: Arc<UrlService>,
}

/// 准备服务器启动的上下文
///
/// 依次建立存储（含迁移）、缓存、分析管道，最后组装 UrlService。
/// 分析管道在返回前已经启动。
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let cache = cache::create_cache(&config.cache)
        .await
        .context("Failed to create cache backend")?;
    info!(
        "Using cache backend: {} (ttl {:?})",
        cache.backend_name(),
        cache.default_ttl()
    );

    let pipeline = Arc::new(AnalyticsPipeline::new(
        storage.as_analytics_sink(),
        &config.analytics,
    ));
    pipeline.start();

    let url_service = Arc::new(UrlService::new(
        storage,
        cache.clone(),
        pipeline.clone(),
        config.allocator,
        config.timeouts,
        &config.server.public_url,
    ));

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        cache,
        pipeline,
        url_service,
    })
}
