use async_trait::async_trait;
use url::Url;

use crate::error::EngineError;
use crate::store::partition::StoredResponse;

/// Origin-server fetch abstraction. Tests inject in-memory fakes; the
/// production implementation is `http_source::HttpSource`.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Perform one request against the origin, preserving status, headers,
    /// and body. A transport timeout surfaces as `EngineError::Network`.
    async fn fetch(
        &self,
        method: &str,
        url: &Url,
        headers: &[(String, String)],
    ) -> Result<StoredResponse, EngineError>;
}
