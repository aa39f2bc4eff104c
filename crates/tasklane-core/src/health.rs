//! Provider health flag
//!
//! A coarse consecutive-failure breaker. The provider is reported
//! unavailable after `failure_threshold` consecutive `ProviderUnavailable`
//! outcomes, where failures further apart than `failure_window` restart the
//! count. The next success clears it. Definitive provider errors leave the
//! count untouched: the provider answered, it just refused.
//!
//! The flag never blocks requests; it only feeds the status snapshot so
//! callers can disable actions ahead of time.

use crate::config::HealthSettings;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Consecutive-failure health tracker for the AI provider
#[derive(Debug)]
pub struct ProviderHealth {
    failure_threshold: u32,
    failure_window: Duration,
    origin: Instant,
    consecutive_failures: AtomicU32,
    /// Millis since `origin` of the last failure, offset by one; 0 = none
    last_failure: AtomicU64,
    available: AtomicBool,
}

impl ProviderHealth {
    /// Create a tracker that starts out healthy
    #[must_use]
    pub fn new(failure_threshold: u32, failure_window: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            failure_window,
            origin: Instant::now(),
            consecutive_failures: AtomicU32::new(0),
            last_failure: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Build from configuration
    #[must_use]
    pub fn from_settings(settings: &HealthSettings) -> Self {
        Self::new(settings.failure_threshold, settings.failure_window())
    }

    /// Whether the provider is currently considered reachable
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Current run of consecutive failures
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Record a successful provider call. Returns true when this flipped
    /// the flag back to available.
    pub fn record_success(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.last_failure.store(0, Ordering::SeqCst);

        let recovered = !self.available.swap(true, Ordering::SeqCst);
        if recovered {
            info!("AI provider recovered");
        }
        recovered
    }

    /// Record a `ProviderUnavailable` outcome. Returns true when this
    /// flipped the flag to unavailable.
    pub fn record_unavailable(&self) -> bool {
        let now = self.origin.elapsed().as_millis() as u64 + 1;
        // Concurrent recorders may read the clock out of order; the stamp
        // only moves forward and an older `now` sees a zero gap.
        let previous = self.last_failure.fetch_max(now, Ordering::SeqCst);
        let gap = Duration::from_millis(now.saturating_sub(previous));

        if previous > 0 && gap > self.failure_window {
            debug!("Previous provider failure outside window, restarting count");
            self.consecutive_failures.store(0, Ordering::SeqCst);
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            failures,
            threshold = self.failure_threshold,
            "AI provider unavailable outcome recorded"
        );

        if failures >= self.failure_threshold && self.available.swap(false, Ordering::SeqCst) {
            warn!(failures, "AI provider marked unavailable");
            return true;
        }
        false
    }
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self::from_settings(&HealthSettings::default())
    }
}
