// Resource validation — admission checks before a response enters a
// partition, and freshness checks before a cached entry is served.

use std::time::Instant;

use crate::classify::ResourceClass;
use crate::error::ValidationError;
use crate::store::partition::{CacheEntry, StoredResponse};

/// Only the leading part of a text body is scanned for markers.
const BODY_SCAN_LIMIT: usize = 64 * 1024;

/// Content-type prefixes acceptable per resource class.
fn allowed_prefixes(class: ResourceClass) -> &'static [&'static str] {
    match class {
        ResourceClass::Static => &[
            "text/",
            "image/",
            "font/",
            "application/javascript",
            "application/x-javascript",
            "application/json",
            "application/manifest+json",
            "application/font",
        ],
        ResourceClass::Dynamic => &["application/", "text/", "image/"],
        ResourceClass::Runtime => &[
            "text/css",
            "text/javascript",
            "application/javascript",
            "font/",
            "application/font",
            "image/",
        ],
        // Unclassified resources are never admitted at all.
        ResourceClass::Unclassified => &[],
    }
}

/// Marker pairs that flag a text body as actively dangerous when both
/// appear: inline script injection combined with dynamic evaluation.
const DANGEROUS_MARKER_PAIRS: &[(&str, &str)] = &[
    ("<script", "eval("),
    ("javascript:", "eval("),
    ("<script", "document.write(unescape("),
];

/// Decide whether a response may be admitted to (or served for) the given
/// resource class.
pub fn admission_check(
    class: ResourceClass,
    response: &StoredResponse,
) -> Result<(), ValidationError> {
    let content_type = response.content_type();

    let matched = content_type.is_some_and(|ct| {
        let ct = ct.trim();
        allowed_prefixes(class)
            .iter()
            .any(|prefix| ct.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)))
    });
    if !matched {
        return Err(ValidationError::ContentTypeMismatch {
            class,
            content_type: content_type.map(str::to_string),
        });
    }

    if is_text_type(content_type.unwrap_or_default()) {
        if let Some(marker) = dangerous_marker(&response.body) {
            return Err(ValidationError::Dangerous(marker));
        }
    }

    Ok(())
}

/// Whether a cached entry is still within its declared expiry. Entries
/// without a declared expiry never go stale here; eviction reclaims them.
pub fn freshness_check(entry: &CacheEntry) -> bool {
    match entry.expires_at {
        Some(expires_at) => Instant::now() < expires_at,
        None => true,
    }
}

fn is_text_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("text/")
        || ct.contains("javascript")
        || ct.contains("json")
        || ct.contains("xml")
        || ct.contains("svg")
}

fn dangerous_marker(body: &[u8]) -> Option<String> {
    let window = &body[..body.len().min(BODY_SCAN_LIMIT)];
    let text = String::from_utf8_lossy(window).to_ascii_lowercase();
    for (a, b) in DANGEROUS_MARKER_PAIRS {
        if text.contains(a) && text.contains(b) {
            return Some(format!("{a} + {b}"));
        }
    }
    None
}
