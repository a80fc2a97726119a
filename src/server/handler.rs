// Axum gateway — the hosting application's entry point into the engine.
// Resource requests under /fetch are resolved against the app origin and
// dispatched; /control answers the message-style RPC envelope.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{debug, error};

use crate::engine::control::{ControlEnvelope, ControlResponse};
use crate::engine::dispatcher::{CacheEngine, ResourceRequest};
use crate::error::EngineError;
use crate::store::partition::StoredResponse;

pub struct EngineServer {
    port: u16,
    engine: Arc<CacheEngine>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl EngineServer {
    /// Start the gateway on an ephemeral local port, returning a handle.
    pub async fn start(engine: Arc<CacheEngine>) -> Result<Self, EngineError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| EngineError::Configuration(format!("bind failed: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| EngineError::Configuration(format!("local_addr failed: {e}")))?
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let app = Router::new()
            .route("/control", post(control_handler))
            .route("/fetch/{*path}", get(fetch_handler))
            .with_state(engine.clone());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            port,
            engine,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn engine(&self) -> &Arc<CacheEngine> {
        &self.engine
    }

    /// Gateway URL for fetching an app resource path.
    pub fn fetch_url(&self, path: &str) -> String {
        format!(
            "http://127.0.0.1:{}/fetch/{}",
            self.port,
            path.trim_start_matches('/')
        )
    }

    pub fn control_url(&self) -> String {
        format!("http://127.0.0.1:{}/control", self.port)
    }

    /// Shutdown the gateway gracefully and cancel background refreshes.
    pub fn shutdown(mut self) {
        self.engine.shutdown();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// GET /fetch/{*path} — dispatch one resource request through the engine.
async fn fetch_handler(
    State(engine): State<Arc<CacheEngine>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let url = match engine.resolve_app_url(&format!("/{path}"), query.as_deref()) {
        Ok(url) => url,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("bad resource path: {e}")).into_response();
        }
    };

    let mut request = ResourceRequest::get(url);
    for name in ["accept", "accept-language", "if-none-match"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            request.headers.push((name.to_string(), value.to_string()));
        }
    }

    debug!(url = %request.url, "gateway fetch");
    match engine.handle(&request).await {
        Ok(stored) => stored_to_http(&stored),
        Err(EngineError::NotActive) => {
            (StatusCode::SERVICE_UNAVAILABLE, "engine not active").into_response()
        }
        Err(e) => {
            error!("dispatch failed: {e}");
            (StatusCode::BAD_GATEWAY, format!("error: {e}")).into_response()
        }
    }
}

/// POST /control — message-style RPC. A malformed envelope is answered
/// with the same typed failure shape, never a silent no-op.
async fn control_handler(
    State(engine): State<Arc<CacheEngine>>,
    envelope: Result<Json<ControlEnvelope>, JsonRejection>,
) -> Json<ControlResponse> {
    match envelope {
        Ok(Json(envelope)) => Json(engine.handle_control(&envelope)),
        Err(rejection) => {
            let err = EngineError::Control(format!("malformed control request: {rejection}"));
            Json(ControlResponse::failure(err.to_string()))
        }
    }
}

/// Rebuild an HTTP response from a stored one, preserving status, headers,
/// and body. Framing headers are recomputed by the server.
fn stored_to_http(stored: &StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut builder = Response::builder().status(status);
    for (name, value) in &stored.headers {
        if is_framing_header(name) {
            continue;
        }
        builder = builder.header(name, value);
    }

    match builder.body(Body::from(stored.body.clone())) {
        Ok(response) => response,
        Err(e) => {
            error!("response rebuild failed: {e}");
            (StatusCode::BAD_GATEWAY, "invalid stored response").into_response()
        }
    }
}

fn is_framing_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("content-length")
        || name.eq_ignore_ascii_case("transfer-encoding")
        || name.eq_ignore_ascii_case("connection")
}
