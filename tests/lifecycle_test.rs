// Install/activate lifecycle and version migration.

mod common;

use std::sync::Arc;

use url::Url;

use common::{active_engine, response, test_config, FakeSource};
use sw_cache_engine::engine::control::ControlEnvelope;
use sw_cache_engine::engine::dispatcher::{CacheEngine, ResourceRequest};
use sw_cache_engine::engine::lifecycle::LifecycleState;
use sw_cache_engine::error::EngineError;

const ORIGIN: &str = "https://cards.test";

#[tokio::test]
async fn test_cold_start_with_partial_manifest() {
    let source = Arc::new(FakeSource::new());
    source.insert(
        "https://cards.test/index.html",
        response("text/html; charset=utf-8", b"<h1>cards</h1>"),
    );
    source.insert(
        "https://cards.test/styles.css",
        response("text/css", b"body {}"),
    );
    // Third manifest resource answers 404.

    let mut config = test_config(ORIGIN);
    config.core_manifest = vec![
        "/index.html".to_string(),
        "/styles.css".to_string(),
        "/missing.png".to_string(),
    ];

    let engine = CacheEngine::new(config, source.clone()).unwrap();
    engine.install().await.unwrap();
    assert_eq!(engine.state(), LifecycleState::Installed);

    // Two of three warmed; the 404 was logged, not fatal.
    let static_partition = engine.registry().get("v2.0.0-static").unwrap();
    assert_eq!(static_partition.entry_count(), 2);

    engine.activate().unwrap();
    assert_eq!(engine.state(), LifecycleState::Active);

    // The warmed index is now served without touching the network.
    let calls_before = source.calls();
    let served = engine
        .handle(&ResourceRequest::get(
            Url::parse("https://cards.test/index.html").unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(&served.body[..], b"<h1>cards</h1>");
    assert_eq!(source.calls(), calls_before);
}

#[tokio::test]
async fn test_activate_purges_stale_version_partitions() {
    let source = Arc::new(FakeSource::new());
    let engine = CacheEngine::new(test_config(ORIGIN), source).unwrap();

    // A leftover partition from a previous generation.
    engine.registry().ensure("v1.0.0-static", 1024);

    engine.install().await.unwrap();
    engine.activate().unwrap();

    assert!(engine.registry().get("v1.0.0-static").is_none());
    assert!(engine.registry().get("v2.0.0-static").is_some());
    assert!(engine.registry().get("v2.0.0-dynamic").is_some());
    assert!(engine.registry().get("v2.0.0-runtime").is_some());
}

#[tokio::test]
async fn test_no_traffic_before_activation() {
    let source = Arc::new(FakeSource::new());
    let engine = CacheEngine::new(test_config(ORIGIN), source).unwrap();

    let request = ResourceRequest::get(Url::parse("https://cards.test/app.js").unwrap());
    assert!(matches!(
        engine.handle(&request).await,
        Err(EngineError::NotActive)
    ));

    // ACTIVATE without INSTALL is a configuration error.
    assert!(matches!(
        engine.activate(),
        Err(EngineError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_activation_broadcasts_lifecycle_event() {
    let source = Arc::new(FakeSource::new());
    let engine = CacheEngine::new(test_config(ORIGIN), source).unwrap();
    let mut events = engine.subscribe();

    engine.install().await.unwrap();
    engine.activate().unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.version, "v2.0.0");
    assert_eq!(event.features.len(), 4);
    assert!(event.features.iter().any(|f| f == "stale-while-revalidate"));
}

#[tokio::test]
async fn test_reinstall_while_active_only_reverifies_freshness() {
    let source = Arc::new(FakeSource::new());
    source.insert(
        "https://cards.test/index.html",
        response("text/html", b"<h1>cards</h1>"),
    );

    let mut config = test_config(ORIGIN);
    config.core_manifest = vec!["/index.html".to_string()];

    let engine = CacheEngine::new(config, source.clone()).unwrap();
    engine.install().await.unwrap();
    engine.activate().unwrap();
    let calls_after_install = source.calls();

    // The warmed entry has no declared expiry, so a second INSTALL has
    // nothing to refresh and stays Active.
    engine.install().await.unwrap();
    assert_eq!(source.calls(), calls_after_install);
    assert_eq!(engine.state(), LifecycleState::Active);
}

#[tokio::test]
async fn test_skip_waiting_activates_immediately() {
    let source = Arc::new(FakeSource::new());
    let engine = CacheEngine::new(test_config(ORIGIN), source).unwrap();
    engine.install().await.unwrap();

    let reply = engine.handle_control(&ControlEnvelope::new("SKIP_WAITING"));
    assert!(reply.success);
    assert_eq!(engine.state(), LifecycleState::Active);
}

#[tokio::test]
async fn test_shutdown_suppresses_new_revalidations() {
    let source = Arc::new(FakeSource::new());
    source.insert(
        "https://cdn.jsdelivr.net/npm/somelib",
        response("application/javascript", b"v1"),
    );
    let engine = active_engine(test_config(ORIGIN), source.clone()).await;

    let request = ResourceRequest::get(Url::parse("https://cdn.jsdelivr.net/npm/somelib").unwrap());
    engine.handle(&request).await.unwrap();
    let calls_after_miss = source.calls();

    engine.shutdown();

    // A hit after shutdown is still served, but no background refresh starts.
    let served = engine.handle(&request).await.unwrap();
    assert_eq!(&served.body[..], b"v1");
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(source.calls(), calls_after_miss);
}
