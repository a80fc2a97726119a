// Control endpoint — a small message-style RPC surface for the hosting
// application: version info, cache status, manual clear, and manual
// storage optimization. Unknown request types yield a typed error.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::dispatcher::{CacheEngine, STRATEGY_NAMES};
use crate::error::EngineError;

/// Inbound control message: a type tag plus optional payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlEnvelope {
    #[serde(rename = "type")]
    pub request_type: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl ControlEnvelope {
    pub fn new(request_type: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            payload: None,
        }
    }
}

/// Control reply: success flag plus a typed result or an error message.
#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::err(message)
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct PartitionStatus {
    name: String,
    entries: usize,
    size_bytes: u64,
    quota_bytes: u64,
}

impl CacheEngine {
    /// Answer one control request. Synchronous from the caller's view;
    /// every operation here touches only in-process partition state.
    pub fn handle_control(&self, envelope: &ControlEnvelope) -> ControlResponse {
        match envelope.request_type.as_str() {
            "GET_VERSION" => ControlResponse::ok(json!({
                "version": self.config().cache_version,
                "strategies": STRATEGY_NAMES,
            })),

            "GET_CACHE_STATUS" => {
                let prefix = format!("{}-", self.config().cache_version);
                let partitions: Vec<PartitionStatus> = self
                    .registry()
                    .with_prefix(&prefix)
                    .iter()
                    .map(|p| PartitionStatus {
                        name: p.name().to_string(),
                        entries: p.entry_count(),
                        size_bytes: p.total_size(),
                        quota_bytes: p.quota(),
                    })
                    .collect();
                ControlResponse::ok(json!({
                    "partitions": partitions,
                    "storage_estimate": self.config().storage_estimate,
                }))
            }

            "CLEAR_CACHE" => {
                let prefix = format!("{}-", self.config().cache_version);
                let mut cleared = 0usize;
                for partition in self.registry().with_prefix(&prefix) {
                    cleared += partition.clear();
                }
                info!(cleared, "manual cache clear");
                ControlResponse::ok(json!({ "cleared_entries": cleared }))
            }

            "OPTIMIZE_STORAGE" => {
                let prefix = format!("{}-", self.config().cache_version);
                let mut freed = 0u64;
                for partition in self.registry().with_prefix(&prefix) {
                    freed += partition.optimize();
                }
                info!(freed, "manual storage optimization");
                ControlResponse::ok(json!({ "freed_bytes": freed }))
            }

            "SKIP_WAITING" => match self.activate() {
                Ok(()) => ControlResponse::ok(json!({
                    "version": self.config().cache_version,
                })),
                Err(e) => ControlResponse::err(e.to_string()),
            },

            other => {
                let err = EngineError::Control(format!("unsupported control request '{other}'"));
                warn!("{err}");
                ControlResponse::err(err.to_string())
            }
        }
    }
}
