//! Per-user token bucket rate limiter
//!
//! Short-window admission gate, independent of the daily quota. It
//! rejects bursts ("try again in a few seconds") while the quota ledger
//! rejects sustained use ("try again tomorrow").

use crate::config::RateLimitSettings;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Whole tokens left after this check
    pub remaining: u32,
    /// Time until one token is available (zero when allowed)
    pub retry_after: Duration,
}

/// Token-bucket state. `0 <= tokens <= capacity` always holds.
#[derive(Debug, Clone)]
struct RateBucket {
    tokens: f64,
    last_refill: Instant,
}

/// In-memory token bucket limiter keyed by user
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: DashMap<String, RateBucket>,
}

impl RateLimiter {
    /// Create a limiter with burst `capacity`, refilled at `refill_per_sec`
    #[must_use]
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_sec,
            buckets: DashMap::new(),
        }
    }

    /// Create from configuration
    #[must_use]
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.capacity, settings.refill_per_sec)
    }

    /// Refill lazily, then take one token if available. A rejected check
    /// leaves the bucket untouched apart from the refill.
    pub fn allow(&self, user_id: &str) -> RateDecision {
        let now = Instant::now();
        let mut entry = self
            .buckets
            .entry(user_id.to_string())
            .or_insert_with(|| RateBucket {
                tokens: self.capacity,
                last_refill: now,
            });
        let bucket = entry.value_mut();
        self.refill(bucket, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateDecision {
                allowed: true,
                remaining: bucket.tokens as u32,
                retry_after: Duration::ZERO,
            }
        } else {
            RateDecision {
                allowed: false,
                remaining: 0,
                retry_after: self.time_until_token(bucket.tokens),
            }
        }
    }

    /// Drop buckets that have refilled to capacity; they are
    /// indistinguishable from a new bucket. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            let elapsed = now.saturating_duration_since(bucket.last_refill);
            bucket.tokens + elapsed.as_secs_f64() * self.refill_per_sec < self.capacity
        });
        before.saturating_sub(self.buckets.len())
    }

    fn refill(&self, bucket: &mut RateBucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.refill_per_sec)
            .clamp(0.0, self.capacity);
        bucket.last_refill = now;
    }

    fn time_until_token(&self, tokens: f64) -> Duration {
        let missing = (1.0 - tokens).max(0.0);
        // A vanishing refill rate means "not in any meaningful time"
        Duration::try_from_secs_f64(missing / self.refill_per_sec).unwrap_or(Duration::MAX)
    }
}
