use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

use super::traits::ResourceSource;
use crate::config::NETWORK_TIMEOUT_SECS;
use crate::error::EngineError;
use crate::store::partition::StoredResponse;

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NETWORK_TIMEOUT_SECS))
            .build()
            .map_err(|e| EngineError::Configuration(format!("http client init failed: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceSource for HttpSource {
    async fn fetch(
        &self,
        method: &str,
        url: &Url,
        headers: &[(String, String)],
    ) -> Result<StoredResponse, EngineError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| EngineError::Network(format!("invalid method '{method}'")))?;

        let mut req = self.client.request(method, url.as_str());
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|value| (k.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = resp
            .bytes()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        debug!(url = %url, status, bytes = body.len(), "origin fetch");
        Ok(StoredResponse::new(status, headers, body))
    }
}
