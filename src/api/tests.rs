use crate::middleware::identity::IdentityHeader;
use crate::server::{build_router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tasklane_core::{AiGateway, GatewayConfig, InMemorySubjectStore, SubjectContent, SubjectSource};
use tasklane_llm::{Error as LlmError, MockProvider};
use tower::ServiceExt;

fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.capacity = 100;
    config.retry.max_attempts = 1;
    config
}

fn app_with(config: GatewayConfig, provider: MockProvider, identity: IdentityHeader) -> Router {
    let subjects = Arc::new(InMemorySubjectStore::new());
    subjects.upsert(
        "p1",
        SubjectContent {
            title: "Launch".to_string(),
            ..SubjectContent::default()
        },
    );
    let gateway = AiGateway::new(
        config,
        Arc::new(provider),
        Arc::clone(&subjects) as Arc<dyn SubjectSource>,
    )
    .unwrap();
    build_router(AppState {
        gateway: Arc::new(gateway),
        subjects,
        identity,
    })
}

fn app(config: GatewayConfig, provider: MockProvider) -> Router {
    app_with(config, provider, IdentityHeader::default())
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, retry_after, body)
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = app(test_config(), MockProvider::new());
    let (status, _, body) = send(&app, request("GET", "/api/v1/ai/status", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_custom_identity_header() {
    let app = app_with(
        test_config(),
        MockProvider::new(),
        IdentityHeader::new("X-Forwarded-User"),
    );
    let req = Request::builder()
        .uri("/api/v1/ai/status")
        .header("x-forwarded-user", "u1")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, request("GET", "/api/v1/ai/status", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_summary_flow() {
    let provider = MockProvider::new();
    provider.push_reply("Launch is on track.");
    let app = app(test_config(), provider.clone());

    let (status, _, _) = send(
        &app,
        request("GET", "/api/v1/projects/p1/summary", Some("u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(
        &app,
        request("POST", "/api/v1/projects/p1/summary", Some("u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["kind"], "summary");
    assert_eq!(body["data"]["text"], "Launch is on track.");

    let (status, _, body) = send(
        &app,
        request("GET", "/api/v1/projects/p1/summary", Some("u2"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "Launch is on track.");

    let (_, _, status_body) =
        send(&app, request("GET", "/api/v1/ai/status", Some("u1"), None)).await;
    assert_eq!(status_body["data"]["requests_today"], 1);
    assert_eq!(status_body["data"]["quota_remaining"], 49);
    assert_eq!(status_body["data"]["available"], true);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_put_project_invalidates_summary() {
    let provider = MockProvider::new();
    let app = app(test_config(), provider.clone());

    send(&app, request("POST", "/api/v1/projects/p1/summary", Some("u1"), None)).await;

    let (status, _, body) = send(
        &app,
        request(
            "PUT",
            "/api/v1/projects/p1",
            Some("u1"),
            Some(json!({
                "title": "Launch",
                "tasks": [{ "title": "Book venue", "status": "blocked" }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revision"], 2);

    let (status, _, _) = send(
        &app,
        request("GET", "/api/v1/projects/p1/summary", Some("u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, request("POST", "/api/v1/projects/p1/summary", Some("u1"), None)).await;
    assert_eq!(provider.calls(), 2);
    assert!(provider.prompts()[1].contains("[blocked] Book venue"));
}

#[tokio::test]
async fn test_questions_and_history() {
    let app = app(test_config(), MockProvider::new());

    let (status, _, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/projects/p1/questions",
            Some("u1"),
            Some(json!({ "question": "What is blocked?" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "answer");
    assert_eq!(body["data"]["question"], "What is blocked?");

    let (status, _, body) = send(
        &app,
        request("GET", "/api/v1/projects/p1/questions", Some("u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["project_id"], "p1");
    assert_eq!(body["data"]["answers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let app = app(test_config(), MockProvider::new());

    let (status, _, body) = send(
        &app,
        request("POST", "/api/v1/projects/missing/summary", Some("u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/projects/p1/questions",
            Some("u1"),
            Some(json!({ "question": "  " })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_quota_exceeded_is_429_with_retry_after() {
    let mut config = test_config();
    config.quota.limit = 1;
    let app = app(config, MockProvider::new());

    send(&app, request("POST", "/api/v1/projects/p1/summary", Some("u1"), None)).await;
    let (status, retry_after, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/projects/p1/questions",
            Some("u1"),
            Some(json!({ "question": "Who?" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "QUOTA_EXCEEDED");
    let secs: u64 = retry_after.unwrap().parse().unwrap();
    assert!(secs > 86_000 && secs <= 86_400);
}

#[tokio::test]
async fn test_rate_limited_is_429_with_retry_after() {
    let mut config = test_config();
    config.rate_limit.capacity = 1;
    config.rate_limit.refill_per_sec = 0.1;
    let app = app(config, MockProvider::new());

    send(&app, request("POST", "/api/v1/projects/p1/summary", Some("u1"), None)).await;
    let (status, retry_after, body) = send(
        &app,
        request("POST", "/api/v1/projects/p1/summary", Some("u1"), None),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
    assert!(retry_after.is_some());
    assert!(body["retry_after_secs"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_provider_failures_map_to_gateway_statuses() {
    let provider = MockProvider::new();
    provider.push_error(LlmError::ContentRejected("SAFETY".into()));
    provider.push_error(LlmError::Timeout(30_000));
    let app = app(test_config(), provider);

    let (status, _, body) = send(
        &app,
        request("POST", "/api/v1/projects/p1/summary", Some("u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "PROVIDER_ERROR");

    let (status, _, body) = send(
        &app,
        request("POST", "/api/v1/projects/p1/summary", Some("u1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "PROVIDER_UNAVAILABLE");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app(test_config(), MockProvider::new());

    let (status, _, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _, body) = send(&app, request("GET", "/health/detailed", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider_available"], true);
    assert_eq!(body["cache_entries"], 0);
}
