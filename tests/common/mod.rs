#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use url::Url;

use sw_cache_engine::config::EngineConfig;
use sw_cache_engine::engine::dispatcher::CacheEngine;
use sw_cache_engine::error::EngineError;
use sw_cache_engine::source::traits::ResourceSource;
use sw_cache_engine::store::partition::StoredResponse;

/// In-memory origin server. Unknown URLs answer 404; `set_offline` makes
/// every fetch fail like a dead network.
pub struct FakeSource {
    responses: Mutex<HashMap<String, StoredResponse>>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, url: &str, response: StoredResponse) {
        self.responses.lock().insert(url.to_string(), response);
    }

    /// Number of fetch attempts made against this source.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceSource for FakeSource {
    async fn fetch(
        &self,
        _method: &str,
        url: &Url,
        _headers: &[(String, String)],
    ) -> Result<StoredResponse, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(EngineError::Network("connection refused".to_string()));
        }
        match self.responses.lock().get(url.as_str()) {
            Some(response) => Ok(response.clone()),
            None => Ok(StoredResponse::new(
                404,
                vec![("content-type".to_string(), "text/plain".to_string())],
                Bytes::from_static(b"not found"),
            )),
        }
    }
}

pub fn response(content_type: &str, body: &[u8]) -> StoredResponse {
    StoredResponse::new(
        200,
        vec![("content-type".to_string(), content_type.to_string())],
        Bytes::copy_from_slice(body),
    )
}

/// Like `response`, but with an explicit freshness lifetime. A zero
/// `max_age_secs` produces an entry that is stale on its next read.
pub fn expiring_response(content_type: &str, body: &[u8], max_age_secs: u64) -> StoredResponse {
    StoredResponse::new(
        200,
        vec![
            ("content-type".to_string(), content_type.to_string()),
            ("cache-control".to_string(), format!("max-age={max_age_secs}")),
        ],
        Bytes::copy_from_slice(body),
    )
}

/// Config pointing at a fake origin, with an empty manifest so tests
/// control exactly what gets cached.
pub fn test_config(origin: &str) -> EngineConfig {
    EngineConfig {
        cache_version: "v2.0.0".to_string(),
        app_origin: origin.to_string(),
        core_manifest: Vec::new(),
        ..EngineConfig::default()
    }
}

/// Engine that has gone through INSTALL and ACTIVATE.
pub async fn active_engine(config: EngineConfig, source: Arc<FakeSource>) -> CacheEngine {
    let engine = CacheEngine::new(config, source).unwrap();
    engine.install().await.unwrap();
    engine.activate().unwrap();
    engine
}
