use thiserror::Error;

use crate::classify::ResourceClass;

/// Engine-level error taxonomy.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network fetch failed or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// Response rejected by admission or freshness checks.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Write could not proceed even after eviction. Non-fatal to the
    /// calling strategy; the fetched content is still returned.
    #[error("quota exceeded in partition '{partition}': needed {required} bytes, eviction freed {freed}")]
    Quota {
        partition: String,
        required: u64,
        freed: u64,
    },

    /// Manifest resource missing or invalid at install time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unsupported or malformed control request.
    #[error("control error: {0}")]
    Control(String),

    /// The dispatcher refuses traffic until INSTALL and ACTIVATE complete.
    #[error("cache engine is not active")]
    NotActive,
}

/// Reasons the validator withholds a response from the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Declared content type does not fit the requested resource class.
    /// The response is withheld from the cache but still returned.
    #[error("content type {content_type:?} not acceptable for {class} resources")]
    ContentTypeMismatch {
        class: ResourceClass,
        content_type: Option<String>,
    },

    /// Body matched a known-dangerous marker combination. The engine
    /// substitutes a safe generic error response instead of serving it.
    #[error("dangerous content marker: {0}")]
    Dangerous(String),
}

impl ValidationError {
    pub fn is_dangerous(&self) -> bool {
        matches!(self, ValidationError::Dangerous(_))
    }
}
