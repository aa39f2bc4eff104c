use super::*;
use crate::subject::{InMemorySubjectStore, SubjectContent, TaskItem};
use std::time::Duration;
use tasklane_llm::{Error as LlmError, MockProvider};

struct Harness {
    gateway: Arc<AiGateway>,
    provider: MockProvider,
    subjects: Arc<InMemorySubjectStore>,
}

fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.capacity = 100;
    config.rate_limit.refill_per_sec = 10.0;
    config.retry.initial_delay_ms = 100;
    config.retry.jitter = false;
    config.request_timeout_ms = 1_000;
    config
}

fn content(title: &str) -> SubjectContent {
    SubjectContent {
        title: title.to_string(),
        description: "Quarterly roadmap".to_string(),
        tasks: vec![TaskItem {
            title: "Draft plan".to_string(),
            status: Default::default(),
            assignee: None,
            due: None,
        }],
    }
}

fn harness_with(config: GatewayConfig, provider: MockProvider) -> Harness {
    let subjects = Arc::new(InMemorySubjectStore::new());
    for i in 1..=8 {
        subjects.upsert(&format!("p{i}"), content(&format!("Project {i}")));
    }
    let gateway = AiGateway::new(
        config,
        Arc::new(provider.clone()),
        Arc::clone(&subjects) as Arc<dyn SubjectSource>,
    )
    .unwrap();
    Harness {
        gateway: Arc::new(gateway),
        provider,
        subjects,
    }
}

fn harness(config: GatewayConfig) -> Harness {
    harness_with(config, MockProvider::new())
}

#[tokio::test(start_paused = true)]
async fn test_summary_is_generated_then_served_free() {
    let h = harness(test_config());
    h.provider.push_reply("All on track.");

    let first = h.gateway.generate_summary("u1", "p1").await.unwrap();
    assert_eq!(first.text, "All on track.");
    assert_eq!(first.model, "mock-model");
    assert!(first.usage.is_some());

    let second = h.gateway.generate_summary("u1", "p1").await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.gateway.status("u1").requests_today, 1);

    let prompt = &h.provider.prompts()[0];
    assert!(prompt.contains("Project: Project 1"));
}

#[tokio::test(start_paused = true)]
async fn test_sixth_request_exceeds_quota_of_five() {
    let mut config = test_config();
    config.quota.limit = 5;
    let h = harness(config);

    for i in 1..=5 {
        h.gateway
            .generate_summary("u1", &format!("p{i}"))
            .await
            .unwrap();
    }

    let err = h.gateway.generate_summary("u1", "p6").await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::QuotaExceeded {
            remaining: 0,
            limit: 5,
            ..
        }
    ));
    assert_eq!(h.provider.calls(), 5);

    let status = h.gateway.status("u1");
    assert_eq!(status.quota_remaining, 0);
    assert_eq!(status.requests_today, 5);
}

#[tokio::test(start_paused = true)]
async fn test_cached_summary_expires_after_ttl() {
    let mut config = test_config();
    config.cache_ttl_secs = 600;
    let h = harness(config);

    h.gateway.generate_summary("u1", "p1").await.unwrap();

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    assert!(h.gateway.latest_summary("p1").await.is_some());
    assert_eq!(h.gateway.status("u1").requests_today, 1);

    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    assert!(h.gateway.latest_summary("p1").await.is_none());
    h.gateway.generate_summary("u1", "p1").await.unwrap();
    assert_eq!(h.provider.calls(), 2);
    assert_eq!(h.gateway.status("u1").requests_today, 2);
}

#[tokio::test(start_paused = true)]
async fn test_three_timeouts_charge_once() {
    let provider = MockProvider::new().with_latency(Duration::from_secs(60));
    let h = harness_with(test_config(), provider);

    let err = h.gateway.generate_summary("u1", "p1").await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::ProviderUnavailable { attempts: 3, .. }
    ));
    assert_eq!(h.provider.calls(), 3);
    assert_eq!(h.gateway.status("u1").requests_today, 1);
    assert!(h.gateway.latest_summary("p1").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_retried() {
    let h = harness(test_config());
    h.provider.push_error(LlmError::ServerError("overloaded".into()));
    h.provider.push_error(LlmError::RateLimit);
    h.provider.push_reply("Recovered.");

    let summary = h.gateway.generate_summary("u1", "p1").await.unwrap();
    assert_eq!(summary.text, "Recovered.");
    assert_eq!(h.provider.calls(), 3);
    assert_eq!(h.gateway.status("u1").requests_today, 1);
}

#[tokio::test(start_paused = true)]
async fn test_definitive_failure_is_not_retried_or_cached() {
    let h = harness(test_config());
    h.provider
        .push_error(LlmError::ContentRejected("SAFETY".into()));

    let err = h.gateway.generate_summary("u1", "p1").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::ProviderError("content rejected: SAFETY".into())
    );
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.gateway.status("u1").requests_today, 1);

    h.gateway.generate_summary("u1", "p1").await.unwrap();
    assert_eq!(h.provider.calls(), 2);
    assert_eq!(h.gateway.status("u1").requests_today, 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_is_checked_before_quota() {
    let mut config = test_config();
    config.quota.limit = 1;
    config.rate_limit.capacity = 1;
    config.rate_limit.refill_per_sec = 0.5;
    let h = harness(config);

    h.gateway.generate_summary("u1", "p1").await.unwrap();

    let err = h.gateway.generate_summary("u1", "p2").await.unwrap_err();
    assert!(matches!(err, GatewayError::RateLimited { .. }));
    assert_eq!(err.retry_after_secs(), Some(2));

    tokio::time::advance(Duration::from_secs(2)).await;
    let err = h.gateway.generate_summary("u1", "p2").await.unwrap_err();
    assert!(matches!(err, GatewayError::QuotaExceeded { .. }));
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_requests_share_one_call() {
    let provider = MockProvider::new().with_latency(Duration::from_secs(2));
    let h = harness_with(test_config(), provider);

    let mut handles = Vec::new();
    for i in 0..8 {
        let gateway = Arc::clone(&h.gateway);
        handles.push(tokio::spawn(async move {
            gateway.generate_summary(&format!("u{i}"), "p1").await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.provider.calls(), 1);
    let charged: u32 = (0..8)
        .map(|i| h.gateway.status(&format!("u{i}")).requests_today)
        .sum();
    assert_eq!(charged, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_share_failure() {
    let provider = MockProvider::new().with_latency(Duration::from_millis(500));
    let h = harness_with(test_config(), provider);
    h.provider
        .push_error(LlmError::Api("INVALID_ARGUMENT: bad request".into()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let gateway = Arc::clone(&h.gateway);
        handles.push(tokio::spawn(async move {
            gateway.generate_summary("u1", "p1").await
        }));
    }

    for handle in handles {
        assert!(matches!(
            handle.await.unwrap(),
            Err(GatewayError::ProviderError(_))
        ));
    }
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_request_still_fills_cache() {
    let provider = MockProvider::new().with_latency(Duration::from_secs(5));
    let h = harness_with(test_config(), provider);

    let gateway = Arc::clone(&h.gateway);
    let request = tokio::spawn(async move { gateway.generate_summary("u1", "p1").await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    request.abort();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.gateway.latest_summary("p1").await.is_some());
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_subject_changed_invalidates() {
    let h = harness(test_config());
    h.gateway.generate_summary("u1", "p1").await.unwrap();
    h.gateway.ask_question("u1", "p1", "Who owns the plan?").await.unwrap();

    assert_eq!(h.gateway.subject_changed("p1"), 1);
    assert!(h.gateway.latest_summary("p1").await.is_none());

    h.gateway.generate_summary("u1", "p1").await.unwrap();
    h.gateway.ask_question("u1", "p1", "Who owns the plan?").await.unwrap();
    assert_eq!(h.provider.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_external_revision_change_invalidates() {
    let h = harness(test_config());
    h.gateway.generate_summary("u1", "p1").await.unwrap();

    h.subjects.upsert("p1", content("Renamed project"));

    assert!(h.gateway.latest_summary("p1").await.is_none());
    h.gateway.generate_summary("u1", "p1").await.unwrap();
    assert_eq!(h.provider.calls(), 2);
    assert!(h.provider.prompts()[1].contains("Renamed project"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_is_free() {
    let mut config = test_config();
    config.rate_limit.capacity = 1;
    config.rate_limit.refill_per_sec = 0.01;
    config.max_question_chars = 20;
    let h = harness(config);

    for (subject, question) in [
        ("p1", "   "),
        ("p1", "This question is far too long to accept"),
        ("missing", "Who?"),
        ("", "Who?"),
    ] {
        let err = h.gateway.ask_question("u1", subject, question).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
    let err = h.gateway.generate_summary("", "p1").await.unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.gateway.status("u1").requests_today, 0);
    // The single burst token is still there
    h.gateway.ask_question("u1", "p1", "Who?").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_disabled_features_reject_input() {
    let mut config = test_config();
    config.summaries_enabled = false;
    let h = harness(config);

    let err = h.gateway.generate_summary("u1", "p1").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert!(h.gateway.ask_question("u1", "p1", "Status?").await.is_ok());
    assert!(h.gateway.status("u1").available);
    assert!(!h.gateway.status("u1").summaries_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_equivalent_questions_share_an_answer() {
    let h = harness(test_config());
    h.gateway.ask_question("u1", "p1", "Who is blocked?").await.unwrap();
    h.gateway.ask_question("u2", "p1", "  who is   BLOCKED? ").await.unwrap();
    h.gateway.ask_question("u1", "p1", "What is due?").await.unwrap();

    assert_eq!(h.provider.calls(), 2);
    let history = h.gateway.question_history("p1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].question.as_deref(), Some("Who is blocked?"));
    assert_eq!(history[1].question.as_deref(), Some("What is due?"));
    assert!(h.gateway.question_history("p2").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_health_flag_follows_outcomes() {
    let mut config = test_config();
    config.retry.max_attempts = 1;
    config.health.failure_threshold = 2;
    let h = harness(config);
    let mut events = h.gateway.events().subscribe();

    h.provider.push_error(LlmError::Timeout(1_000));
    h.provider.push_error(LlmError::Network("connection reset".into()));
    assert!(h.gateway.generate_summary("u1", "p1").await.is_err());
    assert!(h.gateway.status("u1").available);
    assert!(h.gateway.generate_summary("u1", "p2").await.is_err());
    assert!(!h.gateway.status("u1").available);

    h.gateway.generate_summary("u1", "p3").await.unwrap();
    assert!(h.gateway.status("u1").available);

    let mut health_events = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let GatewayEvent::ProviderHealthChanged { available } = event {
            health_events.push(available);
        }
    }
    assert_eq!(health_events, vec![false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_quota_events_published() {
    let mut config = test_config();
    config.quota.limit = 1;
    let h = harness(config);
    let mut events = h.gateway.events().subscribe();

    h.gateway.generate_summary("u1", "p1").await.unwrap();
    let _ = h.gateway.generate_summary("u1", "p2").await;

    assert_eq!(
        events.try_recv().unwrap(),
        GatewayEvent::QuotaConsumed {
            user_id: "u1".into(),
            remaining: 0,
            limit: 1,
        }
    );
    assert!(matches!(
        events.try_recv().unwrap(),
        GatewayEvent::QuotaExhausted { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_sweep_reclaims_idle_state() {
    let mut config = test_config();
    config.cache_ttl_secs = 60;
    config.quota.window_secs = 120;
    let h = harness(config);
    h.gateway.generate_summary("u1", "p1").await.unwrap();

    tokio::time::advance(Duration::from_secs(121)).await;
    let stats = h.gateway.sweep();
    assert_eq!(stats.quota_windows, 1);
    assert_eq!(stats.rate_buckets, 1);
    assert_eq!(stats.cache_entries, 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = GatewayConfig::default();
    config.quota.limit = 0;
    let result = AiGateway::new(
        config,
        Arc::new(MockProvider::new()),
        Arc::new(InMemorySubjectStore::new()),
    );
    assert!(result.is_err());
}
