//! Mock AI provider for testing
//!
//! Replays a queue of scripted outcomes. When the queue is empty it echoes
//! a canned reply, so tests only script the calls they care about.

use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::AiProvider;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock provider that returns queued outcomes or a default reply.
#[derive(Clone, Default)]
pub struct MockProvider {
    outcomes: Arc<Mutex<VecDeque<Result<String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicU32>,
    latency: Option<Duration>,
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call (tokio time, so paused clocks apply).
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.lock_outcomes().push_back(Ok(text.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: Error) {
        self.lock_outcomes().push_back(Err(error));
    }

    /// Number of `complete` calls received so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_outcomes(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.outcomes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.prompt.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self.lock_outcomes().pop_front();
        let content = match outcome {
            Some(Ok(text)) => text,
            Some(Err(e)) => return Err(e),
            None => "mock response".to_string(),
        };

        let model = if request.model.is_empty() {
            self.default_model().to_string()
        } else {
            request.model
        };

        Ok(CompletionResponse {
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            content,
            finish_reason: Some("stop".to_string()),
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script_then_default() {
        let mock = MockProvider::new();
        mock.push_reply("first");
        mock.push_error(Error::Timeout(100));

        let first = mock.complete(CompletionRequest::new("", "a")).await.unwrap();
        assert_eq!(first.content, "first");
        assert_eq!(first.model, "mock-model");

        let second = mock.complete(CompletionRequest::new("m", "b")).await;
        assert!(matches!(second, Err(Error::Timeout(100))));

        let third = mock.complete(CompletionRequest::new("m", "c")).await.unwrap();
        assert_eq!(third.content, "mock response");
        assert_eq!(third.model, "m");

        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let mock = MockProvider::new();
        let handle = mock.clone();
        handle.push_reply("shared");

        let resp = mock.complete(CompletionRequest::new("", "x")).await.unwrap();
        assert_eq!(resp.content, "shared");
        assert_eq!(handle.calls(), 1);
    }

    #[test]
    fn test_error_outcome_on_blocking_runtime() {
        let mock = MockProvider::new();
        mock.push_error(Error::ContentRejected("SAFETY".into()));

        let err = tokio_test::block_on(mock.complete(CompletionRequest::new("", "x")));
        let err = tokio_test::assert_err!(err);
        assert!(!err.is_transient());

        let ok = tokio_test::block_on(mock.complete(CompletionRequest::new("", "y")));
        tokio_test::assert_ok!(ok);
    }
}
