use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use crate::analytics::AnalyticsPipeline;

/// 等待 Ctrl+C 或 SIGTERM
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// 停止接收事件并在限定时间内排空分析管道
pub async fn perform_shutdown_tasks(pipeline: &AnalyticsPipeline, timeout: Duration) {
    info!("Draining analytics pipeline (timeout {:?})...", timeout);
    pipeline.shutdown(timeout).await;

    let stats = pipeline.stats();
    if stats.batches_lost > 0 || stats.queued > 0 {
        warn!(
            "Analytics shutdown finished with {} lost batches ({} events), {} still queued",
            stats.batches_lost, stats.events_lost, stats.queued
        );
    } else {
        info!(
            "Analytics pipeline drained: {} events persisted, {} dropped",
            stats.events_persisted, stats.dropped
        );
    }
}
