// Strategy dispatcher — classifies each request and executes one of the
// four serving strategies, coordinating partitions, eviction, and
// validation. Partition locks are never held across a network await.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::fallback;
use super::lifecycle::{LifecycleEvent, LifecycleState};
use crate::classify::{Classifier, ResourceClass};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::source::traits::ResourceSource;
use crate::store::partition::{CacheEntry, CachePartition, StoredResponse};
use crate::store::registry::PartitionRegistry;
use crate::validate;

/// Serving strategies, in dispatch order. Also reported by GET_VERSION
/// and in the activation event.
pub const STRATEGY_NAMES: &[&str] = &[
    "cache-first",
    "network-first",
    "stale-while-revalidate",
    "network-only",
];

/// One inbound resource request at the engine boundary.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl ResourceRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            headers: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Normalized cache key: method plus URL with the fragment stripped.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        format!("{} {}", self.method.to_ascii_uppercase(), url)
    }

    /// Navigation-type requests get an HTML offline page on total failure;
    /// everything else gets a structured error payload.
    pub fn is_navigation(&self) -> bool {
        if let Some(accept) = self.header("accept") {
            return accept.contains("text/html");
        }
        // No Accept header: extension-less paths are typically app navigations.
        self.url
            .path()
            .rsplit('/')
            .next()
            .map(|segment| !segment.contains('.'))
            .unwrap_or(true)
    }
}

/// The cache engine. Owns its partitions outright; request handling only
/// borrows them, so independent engine instances coexist in tests.
pub struct CacheEngine {
    config: EngineConfig,
    app_origin: Url,
    classifier: Classifier,
    registry: PartitionRegistry,
    source: Arc<dyn ResourceSource>,
    pub(super) state: RwLock<LifecycleState>,
    pub(super) events: broadcast::Sender<LifecycleEvent>,
    shutdown: CancellationToken,
}

impl CacheEngine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn ResourceSource>,
    ) -> Result<Self, EngineError> {
        let app_origin = Url::parse(&config.app_origin).map_err(|e| {
            EngineError::Configuration(format!("invalid app origin '{}': {e}", config.app_origin))
        })?;
        let classifier = Classifier::from_config(&config);
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            config,
            app_origin,
            classifier,
            registry: PartitionRegistry::new(),
            source,
            state: RwLock::new(LifecycleState::New),
            events,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PartitionRegistry {
        &self.registry
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Receive lifecycle notifications (activation events).
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Cancel outstanding background revalidation fetches. Abandoned
    /// fetches never leave a partial write behind.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Resolve a path (plus optional query) against the app origin.
    pub fn resolve_app_url(&self, path: &str, query: Option<&str>) -> Result<Url, EngineError> {
        let mut url = self
            .app_origin
            .join(path)
            .map_err(|e| EngineError::Configuration(format!("cannot resolve '{path}': {e}")))?;
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    /// Serve one resource request. Never blocks indefinitely: network
    /// fetches carry the transport timeout, and cache reads are fast.
    ///
    /// A surfaced network failure is replaced by a structured offline
    /// response rather than a bare error.
    pub async fn handle(&self, request: &ResourceRequest) -> Result<StoredResponse, EngineError> {
        if self.state() != LifecycleState::Active {
            return Err(EngineError::NotActive);
        }

        let result = if !self.is_cache_eligible(request) {
            debug!(url = %request.url, method = %request.method, "not cache eligible, network-only");
            self.network_only(request).await
        } else {
            let class = self.classifier.classify(&request.url);
            debug!(url = %request.url, %class, "dispatching");
            match class {
                ResourceClass::Static => self.cache_first(request, class).await,
                ResourceClass::Dynamic => self.network_first(request, class).await,
                ResourceClass::Runtime => self.stale_while_revalidate(request, class).await,
                ResourceClass::Unclassified => self.network_only(request).await,
            }
        };

        match result {
            Err(EngineError::Network(reason)) => {
                warn!(url = %request.url, %reason, "network failure with no fallback, serving offline response");
                Ok(fallback::offline_response(request, &reason))
            }
            other => other,
        }
    }

    /// Only GET requests for the app origin or a trusted host may interact
    /// with a partition. Runtime CDN hosts count as trusted, so a host the
    /// classifier would mark RUNTIME cannot silently degrade to
    /// network-only.
    fn is_cache_eligible(&self, request: &ResourceRequest) -> bool {
        if !request.method.eq_ignore_ascii_case("GET") {
            return false;
        }
        if request.url.origin() == self.app_origin.origin() {
            return true;
        }
        request.url.host_str().is_some_and(|h| {
            self.config
                .allowed_hosts
                .iter()
                .chain(self.config.runtime_hosts.iter())
                .any(|a| a.eq_ignore_ascii_case(h))
        })
    }

    /// Plain GET against the origin, used by the install-time warmup.
    pub(super) async fn source_fetch_get(&self, url: &Url) -> Result<StoredResponse, EngineError> {
        self.source.fetch("GET", url, &[]).await
    }

    pub(super) fn partition(&self, class: ResourceClass) -> Option<Arc<CachePartition>> {
        let suffix = class.partition_suffix()?;
        self.registry.get(&self.config.partition_name(suffix))
    }

    /// Fetch from the network, falling back to a held cached entry on
    /// failure. The fallback may be stale but must still pass the
    /// admission check; without one the failure surfaces to the caller.
    async fn fetch_or_cached(
        &self,
        request: &ResourceRequest,
        class: ResourceClass,
        partition: &Arc<CachePartition>,
        key: &str,
        cached: Option<CacheEntry>,
    ) -> Result<StoredResponse, EngineError> {
        match self
            .source
            .fetch(&request.method, &request.url, &request.headers)
            .await
        {
            Ok(response) => Ok(self.admit(partition, class, key, response)),
            Err(EngineError::Network(reason)) => match cached {
                Some(entry) if validate::admission_check(class, &entry.response).is_ok() => {
                    debug!(key = %key, %reason, "network failed, serving cached fallback");
                    Ok(entry.response)
                }
                _ => Err(EngineError::Network(reason)),
            },
            Err(e) => Err(e),
        }
    }

    /// STATIC: cache hit wins; miss or stale entry falls through to the
    /// network, and the fetched response is admitted best-effort. A stale
    /// entry is held and served if the refetch fails.
    async fn cache_first(
        &self,
        request: &ResourceRequest,
        class: ResourceClass,
    ) -> Result<StoredResponse, EngineError> {
        let partition = self.partition(class).ok_or(EngineError::NotActive)?;
        let key = request.cache_key();

        let stale = match partition.get(&key) {
            Some(entry) if validate::freshness_check(&entry) => {
                debug!(key = %key, "cache-first hit");
                return Ok(entry.response);
            }
            Some(entry) => {
                debug!(key = %key, "cached entry stale, refetching");
                Some(entry)
            }
            None => None,
        };

        self.fetch_or_cached(request, class, &partition, &key, stale)
            .await
    }

    /// DYNAMIC: network wins; a failure falls back to a cached copy when
    /// one exists and the validator still approves it (stale is
    /// acceptable when offline).
    async fn network_first(
        &self,
        request: &ResourceRequest,
        class: ResourceClass,
    ) -> Result<StoredResponse, EngineError> {
        let partition = self.partition(class).ok_or(EngineError::NotActive)?;
        let key = request.cache_key();
        let cached = partition.peek(&key);

        self.fetch_or_cached(request, class, &partition, &key, cached)
            .await
    }

    /// RUNTIME: a fresh cached entry is returned immediately while a
    /// fire-and-forget task refreshes the partition. Misses wait on the
    /// network like cache-first; a stale entry is held as the fallback
    /// should the blocking refetch fail.
    async fn stale_while_revalidate(
        &self,
        request: &ResourceRequest,
        class: ResourceClass,
    ) -> Result<StoredResponse, EngineError> {
        let partition = self.partition(class).ok_or(EngineError::NotActive)?;
        let key = request.cache_key();

        let stale = match partition.get(&key) {
            Some(entry) if validate::freshness_check(&entry) => {
                debug!(key = %key, "stale-while-revalidate hit, refreshing in background");
                self.spawn_revalidation(Arc::clone(&partition), class, key, request.clone());
                return Ok(entry.response);
            }
            other => other,
        };

        self.fetch_or_cached(request, class, &partition, &key, stale)
            .await
    }

    /// UNCLASSIFIED or ineligible: straight pass-through, no partition
    /// interaction, status/headers/body preserved.
    async fn network_only(&self, request: &ResourceRequest) -> Result<StoredResponse, EngineError> {
        self.source
            .fetch(&request.method, &request.url, &request.headers)
            .await
    }

    /// Store a fetched response if it qualifies, and decide what the
    /// caller receives. Error statuses and validator-withheld responses
    /// are returned uncached; a QuotaError only skips the admission step;
    /// an actively dangerous body is replaced by a generic error response.
    fn admit(
        &self,
        partition: &Arc<CachePartition>,
        class: ResourceClass,
        key: &str,
        response: StoredResponse,
    ) -> StoredResponse {
        if !response.is_success() {
            debug!(key = %key, status = response.status, "error response not cached");
            return response;
        }

        match validate::admission_check(class, &response) {
            Ok(()) => {
                if response
                    .header("cache-control")
                    .is_some_and(|cc| cc.contains("no-store"))
                {
                    debug!(key = %key, "no-store response not cached");
                    return response;
                }
                let entry = CacheEntry::new(response.clone());
                if let Err(e) = partition.insert(key.to_string(), entry) {
                    warn!(key = %key, "cache admission skipped: {e}");
                }
                response
            }
            Err(e) if e.is_dangerous() => {
                warn!(key = %key, "dangerous response blocked: {e}");
                fallback::blocked_response()
            }
            Err(e) => {
                debug!(key = %key, "response withheld from cache: {e}");
                response
            }
        }
    }

    /// Background refresh for stale-while-revalidate. Failures are logged
    /// and never reach the caller that already got a response; shutdown
    /// abandons the fetch without touching partition state.
    fn spawn_revalidation(
        &self,
        partition: Arc<CachePartition>,
        class: ResourceClass,
        key: String,
        request: ResourceRequest,
    ) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let source = Arc::clone(&self.source);
        let token = self.shutdown.clone();

        tokio::spawn(async move {
            let fetched = tokio::select! {
                result = source.fetch(&request.method, &request.url, &request.headers) => result,
                _ = token.cancelled() => {
                    debug!(key = %key, "revalidation abandoned on shutdown");
                    return;
                }
            };

            match fetched {
                Ok(response) if response.is_success() => {
                    match validate::admission_check(class, &response) {
                        Ok(()) => {
                            if let Err(e) = partition.insert(key.clone(), CacheEntry::new(response))
                            {
                                warn!(key = %key, "revalidation admission skipped: {e}");
                            } else {
                                debug!(key = %key, "revalidation refreshed entry");
                            }
                        }
                        Err(e) => debug!(key = %key, "revalidated response withheld: {e}"),
                    }
                }
                Ok(response) => {
                    debug!(key = %key, status = response.status, "revalidation returned error status")
                }
                Err(e) => warn!(key = %key, "background revalidation failed: {e}"),
            }
        });
    }
}
