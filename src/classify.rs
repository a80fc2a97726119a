// Resource classification — an ordered rule table mapping request URLs to
// resource classes. Evaluation order matters: STATIC rules run before
// DYNAMIC before RUNTIME; first match wins, no match is UNCLASSIFIED.

use std::fmt;

use url::Url;

use crate::config::{EngineConfig, STATIC_EXTENSIONS};

/// Category assigned to a request, determining its serving strategy.
/// Derived per request, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Static,
    Dynamic,
    Runtime,
    Unclassified,
}

impl ResourceClass {
    /// Partition name suffix for classes that have a partition.
    /// UNCLASSIFIED resources never touch a partition.
    pub fn partition_suffix(self) -> Option<&'static str> {
        match self {
            ResourceClass::Static => Some("static"),
            ResourceClass::Dynamic => Some("dynamic"),
            ResourceClass::Runtime => Some("runtime"),
            ResourceClass::Unclassified => None,
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceClass::Static => "static",
            ResourceClass::Dynamic => "dynamic",
            ResourceClass::Runtime => "runtime",
            ResourceClass::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

enum Matcher {
    /// Path file extension is in the list (case-insensitive).
    PathExtension(Vec<String>),
    /// Path starts with one of the prefixes.
    PathPrefix(Vec<String>),
    /// Path contains one of the segments.
    PathSegment(Vec<String>),
    /// URL carries any query string.
    HasQuery,
    /// Host is in the list (exact match).
    Host(Vec<String>),
}

impl Matcher {
    fn matches(&self, url: &Url) -> bool {
        match self {
            Matcher::PathExtension(exts) => path_extension(url)
                .map(|ext| exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
                .unwrap_or(false),
            Matcher::PathPrefix(prefixes) => {
                prefixes.iter().any(|p| url.path().starts_with(p.as_str()))
            }
            Matcher::PathSegment(segments) => {
                segments.iter().any(|s| url.path().contains(s.as_str()))
            }
            Matcher::HasQuery => url.query().is_some_and(|q| !q.is_empty()),
            Matcher::Host(hosts) => url
                .host_str()
                .is_some_and(|h| hosts.iter().any(|a| a.eq_ignore_ascii_case(h))),
        }
    }
}

struct Rule {
    class: ResourceClass,
    matcher: Matcher,
}

/// Ordered classification rule table. New classes can be added by
/// appending rules without touching dispatcher logic.
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn from_config(config: &EngineConfig) -> Self {
        let rules = vec![
            Rule {
                class: ResourceClass::Static,
                matcher: Matcher::PathExtension(
                    STATIC_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
                ),
            },
            Rule {
                class: ResourceClass::Static,
                matcher: Matcher::PathPrefix(config.static_roots.clone()),
            },
            Rule {
                class: ResourceClass::Dynamic,
                matcher: Matcher::PathSegment(config.api_segments.clone()),
            },
            Rule {
                class: ResourceClass::Dynamic,
                matcher: Matcher::HasQuery,
            },
            Rule {
                class: ResourceClass::Runtime,
                matcher: Matcher::Host(config.runtime_hosts.clone()),
            },
        ];
        Self { rules }
    }

    /// Map a URL to its resource class. Total and deterministic; the
    /// first matching rule wins.
    pub fn classify(&self, url: &Url) -> ResourceClass {
        for rule in &self.rules {
            if rule.matcher.matches(url) {
                return rule.class;
            }
        }
        ResourceClass::Unclassified
    }
}

/// Extension of the final path segment, if it has one.
fn path_extension(url: &Url) -> Option<&str> {
    let segment = url.path().rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}
