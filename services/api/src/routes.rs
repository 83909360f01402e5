use std::net::SocketAddr;

use crate::infra::{client_ip, AppState};
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use career_diagnostic::error::AppError;
use career_diagnostic::submission::{build_visitor_hash, SubmissionRecord};
use career_diagnostic::survey::{build_recommendation_payload, RecommendationItem, ResponseOption};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

const SCORING_NOTE: &str = "Recommendations are calculated from your survey responses.";

#[derive(Debug, Serialize)]
pub(crate) struct QuestionItem {
    pub(crate) id: usize,
    pub(crate) statement: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionsResponse {
    pub(crate) questions: Vec<QuestionItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationRequest {
    pub(crate) responses: Vec<ResponseOption>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecommendationResponse {
    pub(crate) recommendations: Vec<RecommendationItem>,
    pub(crate) total_questions: usize,
    pub(crate) completion_percent: u8,
    pub(crate) scoring_note: String,
    pub(crate) prerequisite_note: Option<String>,
}

pub(crate) fn api_router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/api/v1/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/api/v1/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/questions", get(questions_endpoint))
        .route("/api/v1/recommendations", post(recommendations_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn questions_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<QuestionsResponse> {
    let questions = state
        .catalog
        .questions()
        .iter()
        .enumerate()
        .map(|(index, question)| QuestionItem {
            id: index + 1,
            statement: question.statement.clone(),
        })
        .collect();

    Json(QuestionsResponse { questions })
}

pub(crate) async fn recommendations_endpoint(
    Extension(state): Extension<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let (items, prerequisite_note) =
        build_recommendation_payload(&state.catalog, &payload.responses)?;

    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    log_submission(&state, &headers, peer.as_ref(), &payload.responses, &items);

    Ok(Json(RecommendationResponse {
        total_questions: state.catalog.questions().len(),
        completion_percent: 100,
        scoring_note: SCORING_NOTE.to_string(),
        prerequisite_note,
        recommendations: items,
    }))
}

/// Queue a best-effort submission append. Runs off the request future; any
/// failure is logged and never reaches the caller.
fn log_submission(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<&SocketAddr>,
    responses: &[ResponseOption],
    items: &[RecommendationItem],
) {
    let config = &state.submission_config;

    let visitor_hash = if config.enable_visitor_hash {
        config.visitor_hash_secret.as_deref().and_then(|secret| {
            let user_agent = headers
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok());
            client_ip(headers, peer).map(|ip| build_visitor_hash(&ip, user_agent, secret))
        })
    } else {
        None
    };

    let record = SubmissionRecord::new(
        responses.iter().map(|response| response.to_string()).collect(),
        items.iter().map(|item| item.name.clone()).collect(),
        visitor_hash,
        config.schema_version.clone(),
    );

    let store = state.submissions.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(err) = store.append_submission(&record) {
            warn!(error = %err, "submission logging failed");
        }
    });
}
