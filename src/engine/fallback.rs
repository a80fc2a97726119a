// Structured offline responses. A total network failure never surfaces
// as a bare error: navigations get an HTML page, data requests a JSON
// payload, both with a recognizable 503.

use bytes::Bytes;
use serde_json::json;

use super::dispatcher::ResourceRequest;
use crate::store::partition::StoredResponse;

const OFFLINE_PAGE: &str = "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Offline</title></head>\n<body>\n<h1>You are offline</h1>\n<p>This page is not available without a network connection.</p>\n</body>\n</html>\n";

/// Replacement for a surfaced NetworkError with no cached fallback.
pub fn offline_response(request: &ResourceRequest, reason: &str) -> StoredResponse {
    if request.is_navigation() {
        StoredResponse::new(
            503,
            vec![
                ("content-type".to_string(), "text/html; charset=utf-8".to_string()),
                ("cache-control".to_string(), "no-store".to_string()),
            ],
            Bytes::from_static(OFFLINE_PAGE.as_bytes()),
        )
    } else {
        let payload = json!({
            "error": "offline",
            "reason": reason,
            "url": request.url.as_str(),
        });
        StoredResponse::new(
            503,
            vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("cache-control".to_string(), "no-store".to_string()),
            ],
            Bytes::from(payload.to_string()),
        )
    }
}

/// Substitute for a response the validator flagged as actively dangerous.
pub fn blocked_response() -> StoredResponse {
    StoredResponse::new(
        403,
        vec![("content-type".to_string(), "text/plain".to_string())],
        Bytes::from_static(b"resource blocked"),
    )
}
