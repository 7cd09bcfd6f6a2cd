//! Server mode
//!
//! 组装共享对象、启动 HTTP 服务，并在收到信号后按顺序关闭。

use actix_web::{
    App, HttpServer,
    middleware::{self, Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::configure_routes;
use crate::api::middleware::{TimingMiddleware, assign_request_id};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            error!("Server startup failed: {:#}", e);
            e
        })?;

    let url_service = web::Data::from(startup.url_service.clone());
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    let request_timeout = config.timeouts.request();
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TimingMiddleware)
            .wrap(middleware::from_fn(assign_request_id))
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .app_data(url_service.clone())
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(request_timeout)
    .client_disconnect_timeout(Duration::from_millis(1000))
    .workers(cpu_count)
    .disable_signals()
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    warn!(
        "Starting server at http://{} with {} workers (public URL {})",
        bind_address, cpu_count, config.server.public_url
    );

    let handle = server.handle();
    let mut server_task = actix_web::rt::spawn(server);

    let signalled = tokio::select! {
        res = &mut server_task => {
            match res {
                Ok(Ok(())) => info!("HTTP server exited"),
                Ok(Err(e)) => error!("HTTP server failed: {}", e),
                Err(e) => error!("HTTP server task panicked: {}", e),
            }
            false
        }
        _ = lifetime::shutdown::wait_for_shutdown_signal() => true,
    };

    if signalled {
        info!("Stopping HTTP server...");
        handle.stop(true).await;
        if let Err(e) = server_task.await {
            error!("HTTP server task failed during shutdown: {}", e);
        }
    }

    lifetime::shutdown::perform_shutdown_tasks(
        &startup.pipeline,
        Duration::from_secs(config.analytics.shutdown_timeout_secs),
    )
    .await;

    let cache_stats = startup.cache.stats();
    info!(
        "Shutdown complete (cache hits {}, misses {})",
        cache_stats.hits, cache_stats.misses
    );
    Ok(())
}
