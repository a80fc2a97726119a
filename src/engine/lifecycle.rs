// Lifecycle manager — INSTALL warms the static partition from the core
// manifest, ACTIVATE purges stale cache generations and opens the engine
// for traffic. Both phases complete before any request is dispatched.

use tracing::{info, warn};

use super::dispatcher::{CacheEngine, STRATEGY_NAMES};
use crate::classify::ResourceClass;
use crate::error::EngineError;
use crate::store::partition::CacheEntry;
use crate::validate;

/// Engine lifecycle: `New → Installed → Active`. A second INSTALL while
/// Active only re-verifies manifest freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    New,
    Installed,
    Active,
}

/// Notification broadcast to connected application instances on ACTIVATE.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub version: String,
    pub features: Vec<String>,
}

impl CacheEngine {
    /// INSTALL: create the versioned partitions if absent, then warm the
    /// STATIC partition from the core-resource manifest. Individual
    /// manifest failures are logged as configuration errors and never
    /// abort the installation.
    pub async fn install(&self) -> Result<(), EngineError> {
        let config = self.config();
        let already_active = self.state() == LifecycleState::Active;

        for (suffix, quota) in [
            ("static", config.static_quota),
            ("dynamic", config.dynamic_quota),
            ("runtime", config.runtime_quota),
        ] {
            self.registry().ensure(&config.partition_name(suffix), quota);
        }

        // Deployment-time report of the applied configuration.
        info!(
            version = %config.cache_version,
            static_quota = config.static_quota,
            dynamic_quota = config.dynamic_quota,
            runtime_quota = config.runtime_quota,
            manifest_resources = config.core_manifest.len(),
            strategies = ?STRATEGY_NAMES,
            "cache engine installing"
        );

        let static_partition = self
            .partition(ResourceClass::Static)
            .ok_or_else(|| EngineError::Configuration("static partition missing".to_string()))?;

        let mut warmed = 0usize;
        let mut failed = 0usize;
        for path in &config.core_manifest {
            let url = match self.resolve_app_url(path, None) {
                Ok(url) => url,
                Err(e) => {
                    warn!("manifest path '{path}' unresolvable: {e}");
                    failed += 1;
                    continue;
                }
            };
            let key = format!("GET {url}");

            // Re-install while active: skip resources that are still fresh.
            if already_active
                && static_partition
                    .peek(&key)
                    .is_some_and(|entry| validate::freshness_check(&entry))
            {
                continue;
            }

            match self.fetch_manifest_resource(&url).await {
                Ok(response) => match validate::admission_check(ResourceClass::Static, &response) {
                    Ok(()) => match static_partition.insert(key, CacheEntry::new(response)) {
                        Ok(()) => warmed += 1,
                        Err(e) => {
                            warn!("manifest resource {url} not admitted: {e}");
                            failed += 1;
                        }
                    },
                    Err(e) => {
                        warn!(
                            "{}",
                            EngineError::Configuration(format!(
                                "manifest resource {url} rejected: {e}"
                            ))
                        );
                        failed += 1;
                    }
                },
                Err(e) => {
                    warn!("{e}");
                    failed += 1;
                }
            }
        }

        info!(warmed, failed, "install complete");
        if !already_active {
            *self.state.write() = LifecycleState::Installed;
        }
        Ok(())
    }

    async fn fetch_manifest_resource(
        &self,
        url: &url::Url,
    ) -> Result<crate::store::partition::StoredResponse, EngineError> {
        let response = self
            .source_fetch_get(url)
            .await
            .map_err(|e| EngineError::Configuration(format!("manifest resource {url} fetch failed: {e}")))?;
        if !response.is_success() {
            return Err(EngineError::Configuration(format!(
                "manifest resource {url} returned HTTP {}",
                response.status
            )));
        }
        Ok(response)
    }

    /// ACTIVATE: delete every partition outside the active version
    /// namespace, transition to Active, and notify connected application
    /// instances. Requires a prior INSTALL.
    pub fn activate(&self) -> Result<(), EngineError> {
        if self.state() == LifecycleState::New {
            return Err(EngineError::Configuration(
                "ACTIVATE before INSTALL".to_string(),
            ));
        }

        let version = self.config().cache_version.clone();
        let prefix = format!("{version}-");
        for name in self.registry().names() {
            if !name.starts_with(&prefix) {
                info!(partition = %name, "purging stale cache generation");
                self.registry().remove(&name);
            }
        }

        *self.state.write() = LifecycleState::Active;

        let event = LifecycleEvent {
            version: version.clone(),
            features: STRATEGY_NAMES.iter().map(|s| s.to_string()).collect(),
        };
        // No subscribers is fine; the send result only reflects that.
        let _ = self.events.send(event);

        info!(%version, "cache engine active");
        Ok(())
    }
}
