//! Status reporter
//!
//! Read-only view combining the quota ledger with the provider health flag.
//! Computed on every call and never stored, so it cannot drift from the
//! ledger it summarizes.

use crate::health::ProviderHealth;
use crate::quota::QuotaLedger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a client needs to enable or disable AI actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Provider healthy and at least one AI feature enabled
    pub available: bool,
    /// Units left in the user's window
    pub quota_remaining: u32,
    /// Units per window
    pub quota_limit: u32,
    /// Units used in the current window
    pub requests_today: u32,
    /// Seconds until the window rolls over
    pub resets_in_secs: u64,
    /// Summaries feature flag
    pub summaries_enabled: bool,
    /// Questions feature flag
    pub questions_enabled: bool,
}

/// Builds [`StatusSnapshot`]s
#[derive(Debug, Clone)]
pub struct StatusReporter {
    ledger: Arc<QuotaLedger>,
    health: Arc<ProviderHealth>,
    summaries_enabled: bool,
    questions_enabled: bool,
}

impl StatusReporter {
    /// Create a reporter over shared gateway state
    #[must_use]
    pub fn new(
        ledger: Arc<QuotaLedger>,
        health: Arc<ProviderHealth>,
        summaries_enabled: bool,
        questions_enabled: bool,
    ) -> Self {
        Self {
            ledger,
            health,
            summaries_enabled,
            questions_enabled,
        }
    }

    /// Current status for a user
    #[must_use]
    pub fn snapshot(&self, user_id: &str) -> StatusSnapshot {
        let quota = self.ledger.peek(user_id);
        let any_enabled = self.summaries_enabled || self.questions_enabled;

        StatusSnapshot {
            available: self.health.is_available() && any_enabled,
            quota_remaining: quota.remaining,
            quota_limit: quota.limit,
            requests_today: quota.used,
            resets_in_secs: quota.resets_in.as_secs(),
            summaries_enabled: self.summaries_enabled,
            questions_enabled: self.questions_enabled,
        }
    }
}
