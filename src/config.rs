use serde::Deserialize;

/// Default quota for the STATIC partition (50 MB).
pub const DEFAULT_STATIC_QUOTA: u64 = 50 * 1024 * 1024;

/// Default quota for the DYNAMIC partition (25 MB).
pub const DEFAULT_DYNAMIC_QUOTA: u64 = 25 * 1024 * 1024;

/// Default quota for the RUNTIME partition (10 MB).
pub const DEFAULT_RUNTIME_QUOTA: u64 = 10 * 1024 * 1024;

/// Eviction removal cap for routine (per-write) calls, percent of entry count.
pub const ROUTINE_EVICTION_CAP_PCT: u32 = 10;

/// Eviction removal cap for a forced full optimization pass, percent of entry count.
pub const FORCED_EVICTION_CAP_PCT: u32 = 30;

/// A forced optimization pass tries to bring partition usage under this
/// fraction of its quota, percent.
pub const OPTIMIZE_WATERMARK_PCT: u64 = 70;

/// Request timeout applied at the HTTP transport; a timed-out fetch is
/// treated like any other network failure.
pub const NETWORK_TIMEOUT_SECS: u64 = 15;

/// Active cache generation. All partition names are namespaced by this.
pub const DEFAULT_CACHE_VERSION: &str = "v3.2.0";

/// File extensions that classify a request as a STATIC resource.
pub const STATIC_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "mjs", "json", "svg", "png", "jpg", "jpeg", "gif", "webp",
    "ico", "woff", "woff2", "ttf",
];

/// Top-level configuration for the cache engine.
///
/// All of this is static configuration; nothing here is runtime-mutable.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Active cache version, e.g. "v3.2.0". Partitions are named
    /// "{version}-static" / "-dynamic" / "-runtime".
    pub cache_version: String,
    /// Origin of the hosting application; same-origin requests are
    /// eligible for caching.
    pub app_origin: String,
    /// Additional hosts (beyond the app origin and `runtime_hosts`, which
    /// are always eligible) whose resources may be cached.
    pub allowed_hosts: Vec<String>,
    /// Per-partition quotas in bytes.
    pub static_quota: u64,
    pub dynamic_quota: u64,
    pub runtime_quota: u64,
    /// Core-resource manifest: paths (resolved against `app_origin`)
    /// considered critical for offline availability, warmed at install.
    pub core_manifest: Vec<String>,
    /// Path prefixes that mark a request STATIC regardless of extension.
    pub static_roots: Vec<String>,
    /// Path segments that mark a request DYNAMIC (API/data traffic).
    pub api_segments: Vec<String>,
    /// Third-party hosts whose assets use the stale-while-revalidate
    /// RUNTIME strategy.
    pub runtime_hosts: Vec<String>,
    /// Storage-quota estimate from the host environment, if one is known.
    pub storage_estimate: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            app_origin: "http://127.0.0.1:8080".to_string(),
            allowed_hosts: vec![
                "fonts.googleapis.com".to_string(),
                "fonts.gstatic.com".to_string(),
                "cdn.jsdelivr.net".to_string(),
            ],
            static_quota: DEFAULT_STATIC_QUOTA,
            dynamic_quota: DEFAULT_DYNAMIC_QUOTA,
            runtime_quota: DEFAULT_RUNTIME_QUOTA,
            core_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/styles.css".to_string(),
                "/app.js".to_string(),
                "/manifest.json".to_string(),
                "/icons/icon-192.png".to_string(),
            ],
            static_roots: vec!["/assets/".to_string(), "/icons/".to_string()],
            api_segments: vec!["/api/".to_string(), "/data/".to_string()],
            runtime_hosts: vec![
                "fonts.googleapis.com".to_string(),
                "fonts.gstatic.com".to_string(),
                "cdn.jsdelivr.net".to_string(),
            ],
            storage_estimate: None,
        }
    }
}

impl EngineConfig {
    /// Versioned partition name for the given suffix.
    pub fn partition_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.cache_version, suffix)
    }
}
