//! Project AI endpoints
//!
//! - `POST /api/v1/projects/:id/summary` — generate (or reuse) a summary
//! - `GET  /api/v1/projects/:id/summary` — latest cached summary, 404 when none
//! - `POST /api/v1/projects/:id/questions` — ask a question
//! - `GET  /api/v1/projects/:id/questions` — answers generated so far
//! - `PUT  /api/v1/projects/:id` — replace project content, invalidating cached output

use super::{not_found, ApiError, ApiResponse};
use crate::middleware::identity::RequireUser;
use axum::{
    extract::Path,
    response::{IntoResponse, Response},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasklane_core::{
    AiGateway, AnswerArtifact, InMemorySubjectStore, Subject, SubjectContent, SummaryArtifact,
};
use tracing::info;

/// Body of `POST .../questions`
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Response of `GET .../questions`
#[derive(Debug, Serialize)]
pub struct QuestionHistoryResponse {
    pub project_id: String,
    pub answers: Vec<AnswerArtifact>,
}

async fn generate_summary(
    RequireUser(user_id): RequireUser,
    Extension(gateway): Extension<Arc<AiGateway>>,
    Path(project_id): Path<String>,
) -> Result<Json<ApiResponse<SummaryArtifact>>, ApiError> {
    let summary = gateway.generate_summary(&user_id, &project_id).await?;
    Ok(ApiResponse::ok(summary))
}

async fn get_latest_summary(
    RequireUser(_user_id): RequireUser,
    Extension(gateway): Extension<Arc<AiGateway>>,
    Path(project_id): Path<String>,
) -> Response {
    match gateway.latest_summary(&project_id).await {
        Some(summary) => ApiResponse::ok(summary).into_response(),
        None => not_found(format!("No current summary for project {project_id}")),
    }
}

async fn ask_question(
    RequireUser(user_id): RequireUser,
    Extension(gateway): Extension<Arc<AiGateway>>,
    Path(project_id): Path<String>,
    Json(body): Json<AskRequest>,
) -> Result<Json<ApiResponse<AnswerArtifact>>, ApiError> {
    let answer = gateway
        .ask_question(&user_id, &project_id, &body.question)
        .await?;
    Ok(ApiResponse::ok(answer))
}

async fn get_question_history(
    RequireUser(_user_id): RequireUser,
    Extension(gateway): Extension<Arc<AiGateway>>,
    Path(project_id): Path<String>,
) -> Json<ApiResponse<QuestionHistoryResponse>> {
    let answers = gateway.question_history(&project_id);
    ApiResponse::ok(QuestionHistoryResponse {
        project_id,
        answers,
    })
}

async fn put_project(
    RequireUser(user_id): RequireUser,
    Extension(gateway): Extension<Arc<AiGateway>>,
    Extension(subjects): Extension<Arc<InMemorySubjectStore>>,
    Path(project_id): Path<String>,
    Json(content): Json<SubjectContent>,
) -> Json<ApiResponse<Subject>> {
    let subject = subjects.upsert(&project_id, content);
    gateway.subject_changed(&project_id);
    info!(
        user_id = %user_id,
        project_id = %project_id,
        revision = subject.revision,
        tasks = subject.content.tasks.len(),
        "Project content updated"
    );
    ApiResponse::ok(subject)
}

/// Create the project routes.
pub fn projects_routes() -> Router {
    Router::new()
        .route(
            "/api/v1/projects/:id/summary",
            get(get_latest_summary).post(generate_summary),
        )
        .route(
            "/api/v1/projects/:id/questions",
            get(get_question_history).post(ask_question),
        )
        .route("/api/v1/projects/:id", put(put_project))
}
