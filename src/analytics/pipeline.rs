//! 点击分析摄取管道
//!
//! - 入口：容量固定的有界队列，`record` 永不阻塞，队列满时直接丢弃
//! - 排空：单个后台 worker，攒够 `batch_size` 条或距上次刷盘满
//!   `flush_interval` 即刷盘，以先到者为准
//! - 关闭：停止接收，排空队列中剩余事件并做最后一次刷盘

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, trace, warn};

use super::{AnalyticsEvent, AnalyticsSink};
use crate::config::AnalyticsConfig;

/// `record` 的结果，供调用方（及测试）观察背压
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted,
    Dropped,
}

/// 管道计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PipelineStats {
    pub accepted: u64,
    pub dropped: u64,
    pub batches_flushed: u64,
    pub events_persisted: u64,
    pub events_skipped: u64,
    pub batches_lost: u64,
    pub events_lost: u64,
    pub queued: usize,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    dropped: AtomicU64,
    batches_flushed: AtomicU64,
    events_persisted: AtomicU64,
    events_skipped: AtomicU64,
    batches_lost: AtomicU64,
    events_lost: AtomicU64,
}

/// 后台 worker 运行所需的全部状态
struct Worker {
    receiver: mpsc::Receiver<AnalyticsEvent>,
    sink: Arc<dyn AnalyticsSink>,
    counters: Arc<Counters>,
    shutdown: Arc<Notify>,
    batch_size: usize,
    flush_interval: Duration,
}

/// 点击分析管道
///
/// 由启动流程显式构造并注入到 URL 服务中，不存在全局实例。
pub struct AnalyticsPipeline {
    sender: mpsc::Sender<AnalyticsEvent>,
    /// `start` 之前持有 worker 状态，`start` 时取走
    pending_worker: Mutex<Option<Worker>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    accepting: AtomicBool,
    shutdown: Arc<Notify>,
    counters: Arc<Counters>,
}

impl AnalyticsPipeline {
    pub fn new(sink: Arc<dyn AnalyticsSink>, config: &AnalyticsConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let counters = Arc::new(Counters::default());
        let shutdown = Arc::new(Notify::new());

        let worker = Worker {
            receiver,
            sink,
            counters: Arc::clone(&counters),
            shutdown: Arc::clone(&shutdown),
            batch_size: config.batch_size.max(1),
            flush_interval: Duration::from_millis(config.flush_interval_ms.max(1)),
        };

        Self {
            sender,
            pending_worker: Mutex::new(Some(worker)),
            worker_handle: Mutex::new(None),
            accepting: AtomicBool::new(true),
            shutdown,
            counters,
        }
    }

    /// 启动后台 worker（需要在 Tokio 运行时内调用）
    ///
    /// 重复调用无副作用，返回是否由本次调用启动。
    pub fn start(&self) -> bool {
        let Some(worker) = take_lock(&self.pending_worker) else {
            return false;
        };

        info!(
            "Analytics pipeline started (capacity: {}, batch size: {}, interval: {:?})",
            self.sender.max_capacity(),
            worker.batch_size,
            worker.flush_interval
        );
        let handle = tokio::spawn(worker.run());
        if let Ok(mut slot) = self.worker_handle.lock() {
            *slot = Some(handle);
        }
        true
    }

    /// 非阻塞入队
    ///
    /// 队列已满或管道已关闭时丢弃事件，调用方永远不会收到错误。
    pub fn record(&self, event: AnalyticsEvent) -> RecordOutcome {
        if !self.accepting.load(Ordering::Acquire) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Analytics pipeline closed, dropping click for {}",
                event.short_code
            );
            return RecordOutcome::Dropped;
        }

        match self.sender.try_send(event) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                trace!("Analytics event queued");
                RecordOutcome::Accepted
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Analytics queue full, dropping click for {} (dropped so far: {})",
                    event.short_code, dropped
                );
                RecordOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Analytics queue closed, dropping click for {}",
                    event.short_code
                );
                RecordOutcome::Dropped
            }
        }
    }

    /// 停止接收新事件，排空队列并等待最后一次刷盘完成
    ///
    /// 超过 `timeout` 仍未完成时放弃等待，剩余事件丢失。
    pub async fn shutdown(&self, timeout: Duration) {
        if !self.accepting.swap(false, Ordering::AcqRel) {
            debug!("Analytics pipeline already shut down");
            return;
        }

        // 从未启动：在当前任务里直接排空
        if let Some(worker) = take_lock(&self.pending_worker) {
            if tokio::time::timeout(timeout, worker.drain_and_exit())
                .await
                .is_err()
            {
                warn!("Analytics final flush timed out after {:?}", timeout);
            }
            return;
        }

        self.shutdown.notify_one();

        let handle = take_lock(&self.worker_handle);
        if let Some(handle) = handle {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => info!("Analytics pipeline drained"),
                Ok(Err(e)) => error!("Analytics worker terminated abnormally: {}", e),
                Err(_) => warn!(
                    "Analytics pipeline did not drain within {:?}, remaining events lost",
                    timeout
                ),
            }
        }
    }

    /// 当前计数器快照
    pub fn stats(&self) -> PipelineStats {
        let c = &self.counters;
        PipelineStats {
            accepted: c.accepted.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            batches_flushed: c.batches_flushed.load(Ordering::Relaxed),
            events_persisted: c.events_persisted.load(Ordering::Relaxed),
            events_skipped: c.events_skipped.load(Ordering::Relaxed),
            batches_lost: c.batches_lost.load(Ordering::Relaxed),
            events_lost: c.events_lost.load(Ordering::Relaxed),
            queued: self.sender.max_capacity() - self.sender.capacity(),
        }
    }
}

fn take_lock<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

impl Worker {
    async fn run(mut self) {
        let mut batch: Vec<AnalyticsEvent> = Vec::with_capacity(self.batch_size);
        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = Arc::clone(&self.shutdown);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    debug!("Analytics worker received shutdown signal");
                    break;
                }
                received = self.receiver.recv() => match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= self.batch_size {
                            trace!("Batch size reached, flushing");
                            self.flush(&mut batch).await;
                            ticker.reset();
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        trace!("Flush interval elapsed, flushing {} events", batch.len());
                        self.flush(&mut batch).await;
                    }
                }
            }
        }

        self.finish(batch).await;
    }

    async fn drain_and_exit(self) {
        let batch = Vec::with_capacity(self.batch_size);
        self.finish(batch).await;
    }

    /// 关闭队列，把缓冲中的事件按批次刷完
    async fn finish(mut self, mut batch: Vec<AnalyticsEvent>) {
        self.receiver.close();
        while let Ok(event) = self.receiver.try_recv() {
            batch.push(event);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch).await;
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }
        debug!("Analytics worker exited");
    }

    async fn flush(&self, batch: &mut Vec<AnalyticsEvent>) {
        let events = std::mem::replace(batch, Vec::with_capacity(self.batch_size));
        let count = events.len();

        match self.sink.flush_batch(events).await {
            Ok(report) => {
                self.counters.batches_flushed.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .events_persisted
                    .fetch_add(report.applied as u64, Ordering::Relaxed);
                self.counters
                    .events_skipped
                    .fetch_add(report.skipped as u64, Ordering::Relaxed);
                debug!(
                    "Analytics batch flushed: {} applied, {} skipped",
                    report.applied, report.skipped
                );
            }
            Err(e) => {
                self.counters.batches_lost.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .events_lost
                    .fetch_add(count as u64, Ordering::Relaxed);
                error!("Analytics batch of {} events lost: {}", count, e);
            }
        }
    }
}
