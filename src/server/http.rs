//! HTTP API handlers

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::llm::LlmError;
use crate::server::ServerState;
use crate::tracker::history::{HistoryEntryView, ImprovementRecord, EXPORT_FILE_NAME};
use crate::tracker::survey::{catalog, SurveyResponse};
use crate::tracker::TrackerError;

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub sessions: usize,
}

/// New session response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
}

/// Measure request
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub rate: f64,
    #[serde(default)]
    pub factors: String,
}

/// Analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub measure_index: usize,
    pub survey: SurveyResponse,
}

/// One sidebar entry
#[derive(Debug, Serialize)]
pub struct HistoryItem<'a> {
    #[serde(flatten)]
    pub view: HistoryEntryView,
    pub record: &'a ImprovementRecord,
}

fn error_response(status: StatusCode, message: &str, details: impl ToString) -> Response {
    (
        status,
        Json(json!({
            "error": message,
            "details": details.to_string()
        })),
    )
        .into_response()
}

fn session_not_found(id: Uuid) -> Response {
    error_response(StatusCode::NOT_FOUND, "Session not found", id)
}

fn tracker_error_response(err: TrackerError) -> Response {
    let transport_failure = matches!(&err, TrackerError::Llm(e) if e.is_transport());
    match err {
        TrackerError::Llm(LlmError::MissingApiKey(_)) => {
            error!("{}", err);
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Language model not configured", err)
        }
        TrackerError::Llm(_) if transport_failure => {
            warn!("Language model unreachable: {}", err);
            error_response(StatusCode::BAD_GATEWAY, "Language model unreachable", err)
        }
        TrackerError::Llm(_) => {
            warn!("Language model call failed: {}", err);
            error_response(StatusCode::BAD_GATEWAY, "Language model call failed", err)
        }
        TrackerError::EmptyRecommendation => {
            error_response(StatusCode::BAD_GATEWAY, "Language model call failed", err)
        }
        TrackerError::NoMeasures => {
            error_response(StatusCode::CONFLICT, "No preventive measures yet", err)
        }
        TrackerError::InvalidSelection { .. } => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid measure selection", err)
        }
    }
}

/// Status handler
pub async fn status_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        model: state.config.llm.model.clone(),
        sessions: state.sessions.len().await,
    })
}

/// Survey catalog handler
pub async fn survey_handler() -> impl IntoResponse {
    Json(catalog())
}

/// Start a session
pub async fn create_session_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

/// Recommend measures for a reported rate
pub async fn recommend_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RecommendRequest>,
) -> Response {
    if !req.rate.is_finite() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid dropout rate", req.rate);
    }
    let Some(handle) = state.sessions.get(&id).await else {
        return session_not_found(id);
    };

    match state.tracker.recommend(&handle, req.rate, &req.factors).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => tracker_error_response(e),
    }
}

/// Latest measures of a session
pub async fn latest_measures_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Response {
    let Some(handle) = state.sessions.get(&id).await else {
        return session_not_found(id);
    };
    let session = handle.lock().await;

    match session.latest_measures() {
        Some(record) => Json(record).into_response(),
        None => tracker_error_response(TrackerError::NoMeasures),
    }
}

/// Score a survey, narrate it, and record it
pub async fn analyze_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    let Some(handle) = state.sessions.get(&id).await else {
        return session_not_found(id);
    };

    match state.tracker.analyze(&handle, req.measure_index, &req.survey).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(e) => tracker_error_response(e),
    }
}

/// History, newest first
pub async fn history_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Response {
    let Some(handle) = state.sessions.get(&id).await else {
        return session_not_found(id);
    };
    let session = handle.lock().await;

    let items: Vec<HistoryItem<'_>> = session
        .history()
        .newest_first()
        .map(|record| HistoryItem { view: record.view(), record })
        .collect();
    Json(items).into_response()
}

/// History as a CSV download
pub async fn export_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Response {
    let Some(handle) = state.sessions.get(&id).await else {
        return session_not_found(id);
    };
    let session = handle.lock().await;

    match session.history().to_csv() {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("CSV export failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to export history", e)
        }
    }
}
