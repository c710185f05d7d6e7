//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mentor_common::{CorrectionKind, InputKind, Interaction, UserFeedback};
use mentor_orchestrator::SolveResult;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code {
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    pub text: String,

    #[serde(default = "default_input_kind")]
    pub input_kind: InputKind,
}

fn default_input_kind() -> InputKind {
    InputKind::Text
}

pub async fn solve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SolveRequest>,
) -> Json<SolveResult> {
    info!(
        input_kind = request.input_kind.as_str(),
        preview = %request.text.chars().take(60).collect::<String>(),
        "Solve request"
    );
    let result = state
        .orchestrator
        .solve(&request.text, request.input_kind)
        .await;
    Json(result)
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub interaction_id: String,
    pub approved: bool,

    #[serde(default)]
    pub correct_answer: Option<String>,

    #[serde(default)]
    pub comments: Option<String>,
}

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FeedbackRequest>,
) -> StatusCode {
    state.orchestrator.submit_feedback(
        &request.interaction_id,
        UserFeedback {
            approved: request.approved,
            correct_answer: request.correct_answer,
            comments: request.comments,
        },
    );
    StatusCode::ACCEPTED
}

#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub original: String,
    pub corrected: String,
    pub kind: CorrectionKind,
}

pub async fn record_correction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CorrectionRequest>,
) -> StatusCode {
    state
        .orchestrator
        .record_correction(&request.original, &request.corrected, request.kind);
    StatusCode::ACCEPTED
}

pub async fn get_interaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Interaction>, ErrorResponse> {
    match state.orchestrator.interaction(&id) {
        Ok(Some(interaction)) => Ok(Json(interaction)),
        Ok(None) => Err(ErrorResponse {
            error: format!("No interaction with id '{id}'"),
            code: "not_found",
        }),
        Err(e) => Err(ErrorResponse {
            error: e.to_string(),
            code: "storage_error",
        }),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    10
}

pub async fn recent_interactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Interaction>>, ErrorResponse> {
    state
        .orchestrator
        .recent_interactions(query.limit)
        .map(Json)
        .map_err(|e| ErrorResponse {
            error: e.to_string(),
            code: "storage_error",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_request_defaults_to_text_kind() {
        let request: SolveRequest = serde_json::from_str(r#"{"text": "Solve x+1=2"}"#).unwrap();
        assert_eq!(request.input_kind, InputKind::Text);

        let request: SolveRequest =
            serde_json::from_str(r#"{"text": "...", "input_kind": "image"}"#).unwrap();
        assert_eq!(request.input_kind, InputKind::Image);
    }

    #[test]
    fn correction_request_parses_kind() {
        let request: CorrectionRequest = serde_json::from_str(
            r#"{"original": "x2", "corrected": "x^2", "kind": "ocr"}"#,
        )
        .unwrap();
        assert_eq!(request.kind, CorrectionKind::Ocr);
    }

    #[test]
    fn feedback_request_optional_fields_default() {
        let request: FeedbackRequest =
            serde_json::from_str(r#"{"interaction_id": "abc", "approved": true}"#).unwrap();
        assert!(request.correct_answer.is_none());
        assert!(request.comments.is_none());
    }
}
