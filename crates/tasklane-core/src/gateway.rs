//! AI Gateway
//!
//! Orchestrates one logical AI request:
//!
//! 1. validate input (feature flag, question, subject exists)
//! 2. per-user burst limit
//! 3. cache lookup; a hit is free
//! 4. join an identical in-flight fill, or charge one quota unit and start one
//! 5. provider call with bounded retry, each attempt under a hard timeout
//! 6. cache the artifact and record history/health
//!
//! Every outcome leaves as an [`Artifact`] or a classified [`GatewayError`];
//! retries and provider error types never cross this boundary.

use crate::artifact::{AnswerArtifact, Artifact, SummaryArtifact};
use crate::cache::{CacheKey, FillResult, FillSource, ResponseCache};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::event_bus::{EventBus, GatewayEvent};
use crate::health::ProviderHealth;
use crate::history::QuestionHistory;
use crate::prompt::{question_prompt, summary_prompt, SYSTEM_INSTRUCTION};
use crate::quota::QuotaLedger;
use crate::rate_limiter::RateLimiter;
use crate::retry::{Exhausted, RetryPolicy};
use crate::status::{StatusReporter, StatusSnapshot};
use crate::subject::{Subject, SubjectSource};
use serde::Serialize;
use std::sync::Arc;
use tasklane_llm::{AiProvider, CompletionRequest};
use tracing::{debug, info, instrument, warn};

/// Counts reclaimed by one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Expired quota windows dropped
    pub quota_windows: usize,
    /// Full token buckets dropped
    pub rate_buckets: usize,
    /// Expired or orphaned cache entries dropped
    pub cache_entries: usize,
}

/// Everything a detached fill needs, owned so the fill outlives its caller.
struct FillContext {
    provider: Arc<dyn AiProvider>,
    health: Arc<ProviderHealth>,
    history: Arc<QuestionHistory>,
    events: EventBus,
    retry: RetryPolicy,
    request: CompletionRequest,
    subject_id: String,
    question: Option<String>,
}

/// The AI request gateway
pub struct AiGateway {
    config: GatewayConfig,
    retry: RetryPolicy,
    provider: Arc<dyn AiProvider>,
    subjects: Arc<dyn SubjectSource>,
    ledger: Arc<QuotaLedger>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    health: Arc<ProviderHealth>,
    history: Arc<QuestionHistory>,
    events: EventBus,
    status: StatusReporter,
}

impl std::fmt::Debug for AiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGateway")
            .field("provider", &self.provider.name())
            .field("cache", &self.cache)
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

impl AiGateway {
    /// Build a gateway with fresh ledger, limiter, cache and health state.
    pub fn new(
        config: GatewayConfig,
        provider: Arc<dyn AiProvider>,
        subjects: Arc<dyn SubjectSource>,
    ) -> Result<Self> {
        config.validate()?;

        let ledger = Arc::new(QuotaLedger::from_settings(&config.quota));
        let health = Arc::new(ProviderHealth::from_settings(&config.health));
        let status = StatusReporter::new(
            Arc::clone(&ledger),
            Arc::clone(&health),
            config.summaries_enabled,
            config.questions_enabled,
        );

        Ok(Self {
            retry: RetryPolicy::from_settings(&config.retry, config.request_timeout()),
            limiter: Arc::new(RateLimiter::from_settings(&config.rate_limit)),
            cache: Arc::new(ResponseCache::new(config.cache_ttl())),
            history: Arc::new(QuestionHistory::new()),
            events: EventBus::default(),
            provider,
            subjects,
            ledger,
            health,
            status,
            config,
        })
    }

    /// Publish status events on an existing bus
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Event bus the gateway publishes on
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Shared response cache
    #[must_use]
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Provider health flag, independent of feature flags
    #[must_use]
    pub fn provider_available(&self) -> bool {
        self.health.is_available()
    }

    /// Shared quota ledger
    #[must_use]
    pub fn ledger(&self) -> &Arc<QuotaLedger> {
        &self.ledger
    }

    /// Generate (or serve from cache) a summary of a subject.
    #[instrument(skip(self))]
    pub async fn generate_summary(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> std::result::Result<SummaryArtifact, GatewayError> {
        if !self.config.summaries_enabled {
            return Err(GatewayError::InvalidInput(
                "project summaries are disabled".to_string(),
            ));
        }
        validate_user(user_id)?;
        let subject = self.load_subject(subject_id).await?;
        self.check_rate(user_id)?;

        let prompt = summary_prompt(&subject, self.config.max_context_chars);
        self.serve(user_id, CacheKey::summary(subject_id), &subject, prompt, None)
            .await
    }

    /// Answer (or serve from cache) a question about a subject.
    #[instrument(skip(self, question), fields(question_chars = question.chars().count()))]
    pub async fn ask_question(
        &self,
        user_id: &str,
        subject_id: &str,
        question: &str,
    ) -> std::result::Result<AnswerArtifact, GatewayError> {
        if !self.config.questions_enabled {
            return Err(GatewayError::InvalidInput(
                "project questions are disabled".to_string(),
            ));
        }
        validate_user(user_id)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(GatewayError::InvalidInput("question is empty".to_string()));
        }
        let chars = question.chars().count();
        if chars > self.config.max_question_chars {
            return Err(GatewayError::InvalidInput(format!(
                "question is {chars} characters, limit is {}",
                self.config.max_question_chars
            )));
        }
        let subject = self.load_subject(subject_id).await?;
        self.check_rate(user_id)?;

        let prompt = question_prompt(&subject, question, self.config.max_context_chars);
        self.serve(
            user_id,
            CacheKey::answer(subject_id, question),
            &subject,
            prompt,
            Some(question.to_string()),
        )
        .await
    }

    /// Cached summary of a subject, if one is still valid. Never calls the
    /// provider and never charges quota.
    pub async fn latest_summary(&self, subject_id: &str) -> Option<SummaryArtifact> {
        let subject = self.subjects.fetch(subject_id).await?;
        self.cache.observe_revision(&subject.id, subject.revision);
        self.cache.lookup(&CacheKey::summary(subject_id))
    }

    /// Answers generated for a subject, oldest first
    #[must_use]
    pub fn question_history(&self, subject_id: &str) -> Vec<AnswerArtifact> {
        self.history.list(subject_id)
    }

    /// Status snapshot for a user
    #[must_use]
    pub fn status(&self, user_id: &str) -> StatusSnapshot {
        self.status.snapshot(user_id)
    }

    /// Mutation hook: the subject's content changed, drop its cached
    /// artifacts. Returns the new cache generation.
    pub fn subject_changed(&self, subject_id: &str) -> u64 {
        let generation = self.cache.invalidate(subject_id);
        info!(subject_id, generation, "Subject changed, cached AI output invalidated");
        generation
    }

    /// Reclaim expired quota windows, idle buckets and dead cache entries.
    pub fn sweep(&self) -> SweepStats {
        let stats = SweepStats {
            quota_windows: self.ledger.sweep(),
            rate_buckets: self.limiter.sweep(),
            cache_entries: self.cache.sweep(),
        };
        debug!(?stats, "Gateway sweep finished");
        stats
    }

    async fn load_subject(&self, subject_id: &str) -> std::result::Result<Subject, GatewayError> {
        if subject_id.trim().is_empty() {
            return Err(GatewayError::InvalidInput("project id is empty".to_string()));
        }
        let subject = self
            .subjects
            .fetch(subject_id)
            .await
            .ok_or_else(|| GatewayError::InvalidInput(format!("project {subject_id} not found")))?;
        self.cache.observe_revision(&subject.id, subject.revision);
        Ok(subject)
    }

    fn check_rate(&self, user_id: &str) -> std::result::Result<(), GatewayError> {
        let decision = self.limiter.allow(user_id);
        if decision.allowed {
            Ok(())
        } else {
            debug!(user_id, retry_after_ms = decision.retry_after.as_millis() as u64, "Rate limited");
            Err(GatewayError::RateLimited {
                retry_after: decision.retry_after,
            })
        }
    }

    /// Charge one unit. Runs only for the caller that starts a fill.
    fn charge(&self, user_id: &str) -> std::result::Result<(), GatewayError> {
        let decision = self.ledger.try_consume(user_id, 1);
        if !decision.allowed {
            self.events.publish(GatewayEvent::QuotaExhausted {
                user_id: user_id.to_string(),
                resets_in_secs: decision.resets_in.as_secs(),
            });
            return Err(GatewayError::QuotaExceeded {
                remaining: decision.remaining,
                limit: decision.limit,
                resets_in: decision.resets_in,
            });
        }

        self.events.publish(GatewayEvent::QuotaConsumed {
            user_id: user_id.to_string(),
            remaining: decision.remaining,
            limit: decision.limit,
        });
        Ok(())
    }

    async fn serve(
        &self,
        user_id: &str,
        key: CacheKey,
        subject: &Subject,
        prompt: String,
        question: Option<String>,
    ) -> FillResult {
        if let Some(artifact) = self.cache.lookup(&key) {
            debug!(%key, "Cache hit");
            return Ok(artifact);
        }

        let fill = run_fill(FillContext {
            provider: Arc::clone(&self.provider),
            health: Arc::clone(&self.health),
            history: Arc::clone(&self.history),
            events: self.events.clone(),
            retry: self.retry.clone(),
            request: self.completion_request(prompt),
            subject_id: subject.id.clone(),
            question,
        });

        let (result, source) = self
            .cache
            .join_or_fill(key.clone(), || self.charge(user_id), fill)
            .await;

        match (&result, source) {
            (_, FillSource::Cache) => debug!(%key, "Cache filled while waiting"),
            (_, FillSource::Coalesced) => debug!(%key, "Joined in-flight request"),
            (Ok(_), FillSource::Leader) => info!(%key, user_id, "AI request completed"),
            (Err(e), FillSource::Leader) => warn!(%key, user_id, code = e.code(), error = %e, "AI request failed"),
        }
        result
    }

    fn completion_request(&self, prompt: String) -> CompletionRequest {
        let generation = &self.config.generation;
        let model = if generation.model.is_empty() {
            self.provider.default_model().to_string()
        } else {
            generation.model.clone()
        };
        CompletionRequest::new(model, prompt)
            .with_system(SYSTEM_INSTRUCTION)
            .with_max_tokens(generation.max_tokens)
            .with_temperature(generation.temperature)
    }
}

fn validate_user(user_id: &str) -> std::result::Result<(), GatewayError> {
    if user_id.trim().is_empty() {
        return Err(GatewayError::InvalidInput("user id is empty".to_string()));
    }
    Ok(())
}

/// Provider call with retry, then classification and bookkeeping.
/// Runs detached from any caller.
async fn run_fill(ctx: FillContext) -> FillResult {
    let FillContext {
        provider,
        health,
        history,
        events,
        retry,
        request,
        subject_id,
        question,
    } = ctx;

    let outcome = retry
        .run(|| {
            let provider = Arc::clone(&provider);
            let request = request.clone();
            async move { provider.complete(request).await }
        })
        .await;

    match outcome {
        Ok(response) => {
            if health.record_success() {
                events.publish(GatewayEvent::ProviderHealthChanged { available: true });
            }
            let artifact = match question {
                Some(question) => {
                    Artifact::answer(subject_id, question, response.content, response.model)
                }
                None => Artifact::summary(subject_id, response.content, response.model),
            }
            .with_usage(response.usage);
            history.record(artifact.clone());
            Ok(artifact)
        }
        Err(Exhausted {
            last_error,
            attempts,
        }) if last_error.is_transient() => {
            if health.record_unavailable() {
                events.publish(GatewayEvent::ProviderHealthChanged { available: false });
            }
            Err(GatewayError::ProviderUnavailable {
                attempts,
                detail: last_error.to_string(),
            })
        }
        Err(Exhausted { last_error, .. }) => {
            Err(GatewayError::ProviderError(last_error.to_string()))
        }
    }
}

#[cfg(test)]
mod tests;
