//! Error types for tasklane-llm

use thiserror::Error;

/// Provider error type
///
/// Every variant is either transient (worth retrying) or definitive
/// (a retry cannot change the answer). See [`Error::is_transient`].
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Request rejected by the provider (bad request, auth, unknown model)
    #[error("api error: {0}")]
    Api(String),

    /// Provider refused to generate content (safety / policy block)
    #[error("content rejected: {0}")]
    ContentRejected(String),

    /// Provider-side rate limit (HTTP 429)
    #[error("rate limit exceeded")]
    RateLimit,

    /// 5xx from the provider
    #[error("server error: {0}")]
    ServerError(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Whether a retry of the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::ServerError(_) | Self::Network(_) | Self::Timeout(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
