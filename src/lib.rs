// Multi-strategy resource cache engine.
//
// Every outbound resource request from the hosting application enters
// `engine::dispatcher::CacheEngine::handle`, which classifies the URL,
// picks a serving strategy (cache-first, network-first,
// stale-while-revalidate, network-only) and coordinates the quota-bound
// cache partitions, LRU eviction, and response validation.

use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod server;
pub mod source;
pub mod store;
pub mod validate;

static INIT_TRACING: Once = Once::new();

/// Initialize tracing once for the process. Safe to call from multiple
/// entry points (gateway startup, tests).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("cache engine tracing initialized");
    });
}
