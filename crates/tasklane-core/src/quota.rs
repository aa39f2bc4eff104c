//! Per-user quota ledger
//!
//! Counts AI requests per user per rolling window. This is the single
//! source of truth for "may this user spend one more unit". Each user's
//! window lives in its own `DashMap` entry, so consume-or-reject is atomic
//! per user without a process-wide lock.

use crate::config::QuotaSettings;
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaDecision {
    /// Whether the requested cost was charged
    pub allowed: bool,
    /// Units used in the current window (after this call)
    pub used: u32,
    /// Units left in the current window (after this call)
    pub remaining: u32,
    /// Units per window
    pub limit: u32,
    /// Time until the current window rolls over
    #[serde(serialize_with = "serialize_secs")]
    pub resets_in: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

/// One user's window. `count <= limit` holds at every committed state.
#[derive(Debug, Clone)]
struct QuotaWindow {
    window_start: Instant,
    count: u32,
}

impl QuotaWindow {
    fn fresh(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
        }
    }

    /// Reset if `now` has reached the end of the window. A request exactly
    /// at the boundary belongs to the new window.
    fn roll(&mut self, now: Instant, window: Duration) {
        if now >= self.window_start + window {
            self.window_start = now;
            self.count = 0;
        }
    }
}

/// Process-wide per-user request counter
#[derive(Debug)]
pub struct QuotaLedger {
    limit: u32,
    window: Duration,
    windows: DashMap<String, QuotaWindow>,
}

impl QuotaLedger {
    /// Create a ledger with `limit` units per `window`
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: DashMap::new(),
        }
    }

    /// Create from configuration
    #[must_use]
    pub fn from_settings(settings: &QuotaSettings) -> Self {
        Self::new(settings.limit, settings.window())
    }

    /// Units per window
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Atomically charge `cost` units to `user_id`, or reject without
    /// charging anything.
    pub fn try_consume(&self, user_id: &str, cost: u32) -> QuotaDecision {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(user_id.to_string())
            .or_insert_with(|| QuotaWindow::fresh(now));
        let state = entry.value_mut();
        state.roll(now, self.window);

        let allowed = state
            .count
            .checked_add(cost)
            .is_some_and(|next| next <= self.limit);
        if allowed {
            state.count += cost;
        } else {
            debug!(user_id, used = state.count, limit = self.limit, "Quota exhausted");
        }

        self.decision(allowed, state, now)
    }

    /// Current usage without charging. Resets an expired window as a side
    /// effect, exactly like `try_consume` with cost 0.
    pub fn peek(&self, user_id: &str) -> QuotaDecision {
        let now = Instant::now();
        match self.windows.get_mut(user_id) {
            Some(mut entry) => {
                let state = entry.value_mut();
                state.roll(now, self.window);
                self.decision(true, state, now)
            }
            None => self.decision(true, &QuotaWindow::fresh(now), now),
        }
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, state| now < state.window_start + self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of users with a live window
    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.windows.len()
    }

    fn decision(&self, allowed: bool, state: &QuotaWindow, now: Instant) -> QuotaDecision {
        let window_end = state.window_start + self.window;
        QuotaDecision {
            allowed,
            used: state.count,
            remaining: self.limit.saturating_sub(state.count),
            limit: self.limit,
            resets_in: window_end.saturating_duration_since(now),
        }
    }
}
