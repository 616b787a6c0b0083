use super::state::AppState;
use crate::error::{SessionError, StoreError};
use crate::interviews::{CsvColumns, InterviewStatus, ListQuery, NewInterview};
use crate::session::StopReason;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StopSessionRequest {
    pub reason: Option<StopReason>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: InterviewStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLinkRequest {
    pub candidate_name: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    /// Include the phone column
    pub with_phone: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

fn session_error(err: SessionError) -> Response {
    let status = match &err {
        SessionError::InvalidTransition { .. } | SessionError::Busy => StatusCode::CONFLICT,
        SessionError::Capability { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    warn!("Session request rejected: {}", err);
    error_response(status, err.to_string())
}

fn store_error(err: StoreError) -> Response {
    error!("Interview store failed: {}", err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn not_found(id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Interview {} not found", id))
}

// ============================================================================
// Session handlers
// ============================================================================

/// POST /session/initialize
pub async fn initialize_session(State(state): State<AppState>) -> Response {
    match state.session.initialize().await {
        Ok(session_id) => {
            info!("Session {} ready", session_id);
            let status = state.session.status().await;
            Json(InitializeResponse {
                session_id,
                status: status.to_string(),
            })
            .into_response()
        }
        Err(e) => session_error(e),
    }
}

/// POST /session/start
pub async fn start_session(State(state): State<AppState>) -> Response {
    match state.session.start().await {
        Ok(()) => Json(state.session.stats().await).into_response(),
        Err(e) => session_error(e),
    }
}

/// POST /session/stop
/// Body is optional; `{"reason": "timeout"}` records a timeout stop
pub async fn stop_session(
    State(state): State<AppState>,
    body: Option<Json<StopSessionRequest>>,
) -> Response {
    let reason = body.and_then(|Json(req)| req.reason).unwrap_or_default();
    match state.session.stop(reason).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => session_error(e),
    }
}

/// POST /session/reset
pub async fn reset_session(State(state): State<AppState>) -> Response {
    match state.session.reset().await {
        Ok(()) => Json(state.session.stats().await).into_response(),
        Err(e) => session_error(e),
    }
}

/// GET /session/status
pub async fn session_status(State(state): State<AppState>) -> Response {
    Json(state.session.stats().await).into_response()
}

/// GET /session/report
pub async fn session_report(State(state): State<AppState>) -> Response {
    match state.session.report().await {
        Some(report) => Json(report).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No completed session"),
    }
}

// ============================================================================
// Interview handlers
// ============================================================================

/// GET /interviews
pub async fn list_interviews(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.interviews.list(&query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => store_error(e),
    }
}

/// POST /interviews
pub async fn create_interview(
    State(state): State<AppState>,
    Json(new): Json<NewInterview>,
) -> Response {
    match state.interviews.create(new).await {
        Ok(record) => {
            info!("Interview {} created", record.id);
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(e) => store_error(e),
    }
}

/// GET /interviews/:id
pub async fn get_interview(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.interviews.get(&id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => not_found(&id),
        Err(e) => store_error(e),
    }
}

/// PATCH /interviews/:id/status
pub async fn update_interview_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Response {
    match state.interviews.update_status(&id, req.status).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => not_found(&id),
        Err(e) => store_error(e),
    }
}

/// DELETE /interviews/:id
pub async fn delete_interview(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.interviews.delete(&id).await {
        Ok(id) => Json(DeletedResponse { id }).into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /interviews/analytics
pub async fn interview_analytics(State(state): State<AppState>) -> Response {
    match state.interviews.analytics().await {
        Ok(analytics) => Json(serde_json::json!({ "analytics": analytics })).into_response(),
        Err(e) => store_error(e),
    }
}

/// POST /interviews/:id/verify
/// A rejected link is still a 200 with `valid: false`
pub async fn verify_interview_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VerifyLinkRequest>,
) -> Response {
    match state.interviews.verify_link(&id, &req.candidate_name).await {
        Ok(verification) => {
            if !verification.valid {
                info!("Link for interview {} rejected", id);
            }
            Json(verification).into_response()
        }
        Err(e) => store_error(e),
    }
}

/// GET /interviews/export.csv
pub async fn export_interviews(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(options): Query<ExportOptions>,
) -> Response {
    let columns = if options.with_phone {
        CsvColumns::WithPhone
    } else {
        CsvColumns::Standard
    };

    match state.interviews.export_csv(&query, columns).await {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"interviews.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
