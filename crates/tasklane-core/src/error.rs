//! Error types for tasklane-core
//!
//! [`GatewayError`] is the classified failure half of every AI request
//! outcome. [`Error`] covers setup problems (configuration, provider
//! construction) that never reach a request.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Classified failure of a single logical AI request.
///
/// Every provider-level failure is mapped onto one of these kinds before it
/// leaves the gateway; internal retries are never visible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Caller error (empty question, unknown subject, disabled feature).
    /// Never retried, never charged.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Short-window burst limit hit. Retry after a few seconds.
    #[error("rate limited, retry in {}s", retry_after.as_secs().max(1))]
    RateLimited {
        /// Time until one request token is available again
        retry_after: Duration,
    },

    /// Daily quota exhausted. Nothing was charged.
    #[error("quota exceeded ({remaining}/{limit} remaining)")]
    QuotaExceeded {
        /// Units left in the current window (always 0 in practice)
        remaining: u32,
        /// Units per window
        limit: u32,
        /// Time until the window rolls over
        resets_in: Duration,
    },

    /// Transient upstream failure after exhausting internal retries.
    /// The quota unit stays charged.
    #[error("provider unavailable after {attempts} attempts: {detail}")]
    ProviderUnavailable {
        /// Provider calls made for this request
        attempts: u32,
        /// Last transient failure
        detail: String,
    },

    /// Definitive upstream rejection (bad request, content policy).
    /// The quota unit stays charged.
    #[error("provider error: {0}")]
    ProviderError(String),
}

impl GatewayError {
    /// Stable machine-readable code for API responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            Self::ProviderError(_) => "PROVIDER_ERROR",
        }
    }

    /// Seconds the caller should wait before trying again, if known.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(ceil_secs(*retry_after)),
            Self::QuotaExceeded { resets_in, .. } => Some(ceil_secs(*resets_in)),
            _ => None,
        }
    }

    /// Structured view for display.
    #[must_use]
    pub fn to_body(&self) -> GatewayErrorBody {
        GatewayErrorBody {
            success: false,
            error: self.to_string(),
            code: self.code(),
            retry_after_secs: self.retry_after_secs(),
        }
    }
}

/// Serializable error payload handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayErrorBody {
    /// Always false
    pub success: bool,
    /// Human-readable detail
    pub error: String,
    /// Machine-readable kind
    pub code: &'static str,
    /// Back-off hint in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Setup error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// Provider error during setup
    #[error("llm error: {0}")]
    Llm(#[from] tasklane_llm::Error),
}

impl Error {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}
