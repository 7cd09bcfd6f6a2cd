//! UrlService tests
//!
//! shorten / resolve / stats / list against a temporary SQLite database,
//! the moka cache and a running analytics pipeline.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use snaplink::analytics::AnalyticsPipeline;
use snaplink::cache::object_cache::MokaCacheWrapper;
use snaplink::cache::{CacheResult, ObjectCache, UrlCache};
use snaplink::config::{AllocatorConfig, AnalyticsConfig, DatabaseConfig, TimeoutConfig};
use snaplink::errors::{Result, SnaplinkError};
use snaplink::services::{ClickContext, CodeAllocator, CodeRegistry, LinkStats, UrlService};
use snaplink::storage::{SeaOrmStorage, StorageFactory, UrlRecord};
use tempfile::TempDir;

// =============================================================================
// Test Setup
// =============================================================================

struct TestEnv {
    service: Arc<UrlService>,
    storage: Arc<SeaOrmStorage>,
    pipeline: Arc<AnalyticsPipeline>,
    _dir: TempDir,
}

async fn setup() -> TestEnv {
    setup_with(|service| service, TimeoutConfig::default()).await
}

async fn setup_with<F>(customize: F, timeouts: TimeoutConfig) -> TestEnv
where
    F: FnOnce(UrlService) -> UrlService,
{
    setup_on(Arc::new(MokaCacheWrapper::new(1000)), customize, timeouts).await
}

async fn setup_on<F>(
    backend: Arc<dyn ObjectCache>,
    customize: F,
    timeouts: TimeoutConfig,
) -> TestEnv
where
    F: FnOnce(UrlService) -> UrlService,
{
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join("svc.db").display()),
        ..Default::default()
    };
    let storage = StorageFactory::create(&db_config)
        .await
        .expect("Failed to create storage");

    let cache = Arc::new(UrlCache::new(backend, Duration::from_secs(60)));

    let pipeline = Arc::new(AnalyticsPipeline::new(
        storage.as_analytics_sink(),
        &AnalyticsConfig {
            flush_interval_ms: 20,
            ..Default::default()
        },
    ));
    pipeline.start();

    let service = UrlService::new(
        storage.clone(),
        cache,
        pipeline.clone(),
        AllocatorConfig::default(),
        timeouts,
        "http://sl.test/",
    );

    TestEnv {
        service: Arc::new(customize(service)),
        storage,
        pipeline,
        _dir: dir,
    }
}

/// 永远回答"未占用"，让冲突只能在插入时暴露
struct NeverTaken;

#[async_trait]
impl CodeRegistry for NeverTaken {
    async fn code_exists(&self, _code: &str) -> Result<bool> {
        Ok(false)
    }
}

/// 每次查询都很慢
struct SlowRegistry;

#[async_trait]
impl CodeRegistry for SlowRegistry {
    async fn code_exists(&self, _code: &str) -> Result<bool> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(false)
    }
}

/// 读缓存要 500ms 才返回未命中
struct SlowCache;

#[async_trait]
impl ObjectCache for SlowCache {
    async fn get(&self, _key: &str) -> CacheResult {
        tokio::time::sleep(Duration::from_millis(500)).await;
        CacheResult::Miss
    }

    async fn insert(&self, _key: &str, _value: UrlRecord, _ttl: Duration) {}

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}

async fn wait_for_stats<F>(service: &UrlService, code: &str, done: F) -> LinkStats
where
    F: Fn(&LinkStats) -> bool,
{
    for _ in 0..100 {
        let stats = service.stats(code).await.unwrap();
        if done(&stats) {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    panic!("stats for {} never reached the expected state", code);
}

// =============================================================================
// shorten
// =============================================================================

#[tokio::test]
async fn test_shorten_returns_six_char_code() {
    let env = setup().await;

    let record = env.service.shorten("https://example.com/page").await.unwrap();
    assert_eq!(record.short_code.len(), 6);
    assert!(record.short_code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(record.long_url, "https://example.com/page");
    assert_eq!(record.clicks, 0);
    assert_eq!(
        env.service.short_url(&record.short_code),
        format!("http://sl.test/{}", record.short_code)
    );
}

#[tokio::test]
async fn test_shorten_is_idempotent() {
    let env = setup().await;

    let first = env.service.shorten("https://example.com/same").await.unwrap();
    let second = env.service.shorten("https://example.com/same").await.unwrap();

    assert_eq!(first.short_code, second.short_code);
    assert_eq!(first.id, second.id);
    assert_eq!(env.storage.count_urls().await.unwrap(), 1);
}

#[tokio::test]
async fn test_shorten_rejects_invalid_urls() {
    let env = setup().await;

    for bad in ["not-a-url", "", "javascript:alert(1)", "mailto:someone@example.com"] {
        let err = env.service.shorten(bad).await.unwrap_err();
        assert!(
            matches!(err, SnaplinkError::InvalidInput(_)),
            "{:?} should be rejected, got {:?}",
            bad,
            err
        );
    }
    assert_eq!(env.storage.count_urls().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shorten_of_one_url_creates_one_row() {
    let env = setup().await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = env.service.clone();
            tokio::spawn(async move { service.shorten("https://example.com/race").await })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap().unwrap().short_code);
    }

    assert_eq!(codes.len(), 1);
    assert_eq!(env.storage.count_urls().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shorten_allocates_distinct_codes() {
    let env = setup().await;

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let service = env.service.clone();
            tokio::spawn(async move {
                service
                    .shorten(&format!("https://example.com/distinct/{}", i))
                    .await
            })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap().unwrap().short_code);
    }

    assert_eq!(codes.len(), 32);
    assert_eq!(env.storage.count_urls().await.unwrap(), 32);
}

#[tokio::test]
async fn test_insert_conflict_reallocates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_generator = calls.clone();

    let env = setup_with(
        move |service| {
            let allocator = CodeAllocator::new(Arc::new(NeverTaken), AllocatorConfig::default())
                .with_generator(move |_| {
                    if calls_in_generator.fetch_add(1, Ordering::SeqCst) == 0 {
                        "taken1".to_string()
                    } else {
                        "fresh1".to_string()
                    }
                });
            service.with_allocator(allocator)
        },
        TimeoutConfig::default(),
    )
    .await;

    env.storage
        .insert_url("taken1", "https://example.com/owner")
        .await
        .unwrap();

    let record = env.service.shorten("https://example.com/new").await.unwrap();
    assert_eq!(record.short_code, "fresh1");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_insert_conflicts_exhaust_allocation() {
    let env = setup_with(
        |service| {
            let allocator = CodeAllocator::new(Arc::new(NeverTaken), AllocatorConfig::default())
                .with_generator(|_| "taken1".to_string());
            service.with_allocator(allocator)
        },
        TimeoutConfig::default(),
    )
    .await;

    env.storage
        .insert_url("taken1", "https://example.com/owner")
        .await
        .unwrap();

    let err = env.service.shorten("https://example.com/other").await.unwrap_err();
    assert!(matches!(err, SnaplinkError::AllocationExhausted(_)));
    assert_eq!(env.storage.count_urls().await.unwrap(), 1);
}

#[tokio::test]
async fn test_shorten_times_out() {
    let env = setup_with(
        |service| {
            let allocator = CodeAllocator::new(Arc::new(SlowRegistry), AllocatorConfig::default());
            service.with_allocator(allocator)
        },
        TimeoutConfig {
            redirect_ms: 2000,
            request_ms: 50,
        },
    )
    .await;

    let err = env.service.shorten("https://example.com/slow").await.unwrap_err();
    assert!(matches!(err, SnaplinkError::Timeout(_)));
}

// =============================================================================
// resolve / stats / list
// =============================================================================

#[tokio::test]
async fn test_resolve_populates_cache() {
    let env = setup().await;
    // 直接写库，缓存中没有
    env.storage
        .insert_url("cold01", "https://example.com/cold")
        .await
        .unwrap();

    let first = env
        .service
        .resolve("cold01", ClickContext::default())
        .await
        .unwrap();
    assert_eq!(first.long_url, "https://example.com/cold");
    let after_miss = env.service.cache_stats();
    assert_eq!(after_miss.misses, 1);
    assert_eq!(after_miss.hits, 0);

    env.service
        .resolve("cold01", ClickContext::default())
        .await
        .unwrap();
    let after_hit = env.service.cache_stats();
    assert_eq!(after_hit.misses, 1);
    assert_eq!(after_hit.hits, 1);
}

#[tokio::test]
async fn test_shorten_existing_url_warms_cache() {
    let env = setup().await;
    env.storage
        .insert_url("warm01", "https://example.com/warm")
        .await
        .unwrap();

    let record = env.service.shorten("https://example.com/warm").await.unwrap();
    assert_eq!(record.short_code, "warm01");

    env.service
        .resolve("warm01", ClickContext::default())
        .await
        .unwrap();
    let cache = env.service.cache_stats();
    assert_eq!(cache.hits, 1);
    assert_eq!(cache.misses, 0);
}

#[tokio::test]
async fn test_resolve_times_out_without_recording_click() {
    let env = setup_on(
        Arc::new(SlowCache),
        |service| service,
        TimeoutConfig {
            redirect_ms: 50,
            request_ms: 5000,
        },
    )
    .await;
    env.storage
        .insert_url("slow01", "https://example.com/slow-redirect")
        .await
        .unwrap();

    let err = env
        .service
        .resolve("slow01", ClickContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SnaplinkError::Timeout(_)));
    assert_eq!(env.pipeline.stats().accepted, 0);
}

#[tokio::test]
async fn test_shorten_keeps_url_untrimmed() {
    let env = setup().await;

    let plain = env.service.shorten("https://example.com/exact").await.unwrap();
    let padded = env.service.shorten("https://example.com/exact ").await.unwrap();

    assert_eq!(padded.long_url, "https://example.com/exact ");
    assert_ne!(plain.short_code, padded.short_code);
    assert_eq!(env.storage.count_urls().await.unwrap(), 2);
}

#[tokio::test]
async fn test_resolve_unknown_code_is_not_found() {
    let env = setup().await;

    for code in ["nope42", "bad code!", ""] {
        let err = env
            .service
            .resolve(code, ClickContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SnaplinkError::NotFound(_)));
    }
    assert_eq!(env.pipeline.stats().accepted, 0);
}

#[tokio::test]
async fn test_click_is_eventually_counted() {
    let env = setup().await;
    let record = env.service.shorten("https://example.com/counted").await.unwrap();

    env.service
        .resolve(
            &record.short_code,
            ClickContext {
                ip_address: Some("198.51.100.9".into()),
                user_agent: Some("test-agent".into()),
            },
        )
        .await
        .unwrap();

    let stats = wait_for_stats(&env.service, &record.short_code, |s| s.record.clicks == 1).await;
    assert_eq!(stats.analytics.len(), 1);
    assert_eq!(stats.analytics[0].ip_address.as_deref(), Some("198.51.100.9"));
    assert_eq!(stats.analytics[0].user_agent.as_deref(), Some("test-agent"));

    let pipeline = env.service.pipeline_stats();
    assert_eq!(pipeline.accepted, 1);
    assert_eq!(pipeline.events_persisted, 1);
}

#[tokio::test]
async fn test_stats_unknown_code_is_not_found() {
    let env = setup().await;
    let err = env.service.stats("ghost1").await.unwrap_err();
    assert!(matches!(err, SnaplinkError::NotFound(_)));
}

#[tokio::test]
async fn test_list_applies_limits() {
    let env = setup().await;
    for i in 0..5 {
        env.service
            .shorten(&format!("https://example.com/list/{}", i))
            .await
            .unwrap();
    }

    assert_eq!(env.service.list(None).await.unwrap().len(), 5);
    assert_eq!(env.service.list(Some(2)).await.unwrap().len(), 2);
    assert_eq!(env.service.list(Some(0)).await.unwrap().len(), 5);
    assert_eq!(env.service.list(Some(1000)).await.unwrap().len(), 5);

    let newest = env.service.list(Some(1)).await.unwrap();
    assert_eq!(newest[0].long_url, "https://example.com/list/4");
}

#[tokio::test]
async fn test_shutdown_flushes_pending_clicks() {
    let env = setup().await;
    let record = env.service.shorten("https://example.com/drain").await.unwrap();

    for _ in 0..10 {
        env.service
            .resolve(&record.short_code, ClickContext::default())
            .await
            .unwrap();
    }
    env.pipeline.shutdown(Duration::from_secs(5)).await;

    let stats = env.service.stats(&record.short_code).await.unwrap();
    assert_eq!(stats.record.clicks, 10);
    assert_eq!(stats.analytics.len(), 10);
}
