//! EventBus - broadcast channel for status-changed notifications.
//!
//! The gateway publishes here whenever something a client might display
//! changes: a user's remaining quota or the provider availability flag.
//! The real-time transport (WebSocket, SSE) subscribes and forwards.

use serde::Serialize;
use tokio::sync::broadcast;

/// Status-changed events emitted by the gateway.
///
/// Events carry only counters and flags, never prompts or generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A quota unit was charged
    QuotaConsumed {
        /// User charged
        user_id: String,
        /// Units left in the window
        remaining: u32,
        /// Units per window
        limit: u32,
    },
    /// A request was rejected because the user's quota is spent
    QuotaExhausted {
        /// User rejected
        user_id: String,
        /// Seconds until the window rolls over
        resets_in_secs: u64,
    },
    /// The provider availability flag changed
    ProviderHealthChanged {
        /// New value of the flag
        available: bool,
    },
}

impl GatewayEvent {
    /// User the event concerns, if it is user-scoped.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::QuotaConsumed { user_id, .. } | Self::QuotaExhausted { user_id, .. } => {
                Some(user_id)
            }
            Self::ProviderHealthChanged { .. } => None,
        }
    }
}

/// Broadcast-based event bus.
///
/// Slow subscribers miss events (lagged) rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all active subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: GatewayEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
