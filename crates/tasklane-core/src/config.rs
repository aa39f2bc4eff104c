//! Gateway configuration
//!
//! Deserializable from the `[ai]` table of the application config. Every
//! field has a default so partial tables are accepted.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// AI gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Enable project summaries
    #[serde(default = "default_true")]
    pub summaries_enabled: bool,
    /// Enable project question answering
    #[serde(default = "default_true")]
    pub questions_enabled: bool,
    /// Lifetime of cached summaries and answers
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Maximum characters of project context put into a prompt
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Maximum characters accepted in a question
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
    /// Hard timeout for a single provider attempt
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Per-user daily quota
    #[serde(default)]
    pub quota: QuotaSettings,
    /// Per-user burst limiter
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// Provider retry policy
    #[serde(default)]
    pub retry: RetrySettings,
    /// Provider health tracking
    #[serde(default)]
    pub health: HealthSettings,
    /// Generation parameters sent to the provider
    #[serde(default)]
    pub generation: GenerationSettings,
}

fn default_true() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    600
}
fn default_max_context_chars() -> usize {
    12_000
}
fn default_max_question_chars() -> usize {
    1_000
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            summaries_enabled: true,
            questions_enabled: true,
            cache_ttl_secs: default_cache_ttl(),
            max_context_chars: default_max_context_chars(),
            max_question_chars: default_max_question_chars(),
            request_timeout_ms: default_request_timeout_ms(),
            quota: QuotaSettings::default(),
            rate_limit: RateLimitSettings::default(),
            retry: RetrySettings::default(),
            health: HealthSettings::default(),
            generation: GenerationSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Cache entry lifetime
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Per-attempt provider timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reject settings that would make the gateway unusable.
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(Error::invalid("ai.cache_ttl_secs", "must be > 0"));
        }
        if self.max_context_chars == 0 {
            return Err(Error::invalid("ai.max_context_chars", "must be > 0"));
        }
        if self.max_question_chars == 0 {
            return Err(Error::invalid("ai.max_question_chars", "must be > 0"));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::invalid("ai.request_timeout_ms", "must be > 0"));
        }
        if self.quota.limit == 0 {
            return Err(Error::invalid("ai.quota.limit", "must be > 0"));
        }
        if self.quota.window_secs == 0 {
            return Err(Error::invalid("ai.quota.window_secs", "must be > 0"));
        }
        if self.rate_limit.capacity == 0 {
            return Err(Error::invalid("ai.rate_limit.capacity", "must be > 0"));
        }
        if !(self.rate_limit.refill_per_sec > 0.0) {
            return Err(Error::invalid("ai.rate_limit.refill_per_sec", "must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::invalid("ai.retry.max_attempts", "must be >= 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::invalid("ai.retry.backoff_multiplier", "must be >= 1.0"));
        }
        if self.health.failure_threshold == 0 {
            return Err(Error::invalid("ai.health.failure_threshold", "must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::invalid(
                "ai.generation.temperature",
                format!("{} is outside 0.0-2.0", self.generation.temperature),
            ));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::invalid("ai.generation.max_tokens", "must be > 0"));
        }
        Ok(())
    }
}

/// Per-user quota window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSettings {
    /// Requests per window
    #[serde(default = "default_quota_limit")]
    pub limit: u32,
    /// Window length in seconds
    #[serde(default = "default_quota_window")]
    pub window_secs: u64,
}

fn default_quota_limit() -> u32 {
    50
}
fn default_quota_window() -> u64 {
    86_400
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            limit: default_quota_limit(),
            window_secs: default_quota_window(),
        }
    }
}

impl QuotaSettings {
    /// Window length
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Token bucket parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Bucket capacity (burst size)
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Tokens added per second
    #[serde(default = "default_refill")]
    pub refill_per_sec: f64,
}

fn default_capacity() -> u32 {
    5
}
fn default_refill() -> f64 {
    0.5
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_per_sec: default_refill(),
        }
    }
}

/// Provider retry policy (TOML view of [`crate::retry::RetryPolicy`])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per logical request, first call included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Exponential growth factor
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter
    #[serde(default = "default_true")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8_000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_multiplier(),
            jitter: true,
        }
    }
}

/// Provider health tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Consecutive `ProviderUnavailable` outcomes before reporting unavailable
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Failures further apart than this do not count as consecutive
    #[serde(default = "default_failure_window")]
    pub failure_window_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}
fn default_failure_window() -> u64 {
    300
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            failure_window_secs: default_failure_window(),
        }
    }
}

impl HealthSettings {
    /// Failure window
    #[must_use]
    pub fn failure_window(&self) -> Duration {
        Duration::from_secs(self.failure_window_secs)
    }
}

/// Generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Model identifier (empty = provider default)
    #[serde(default)]
    pub model: String,
    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.4
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}
