// Integration tests for the HTTP control API
//
// Requests go straight through the router with `oneshot`; the session has
// no microphone configured and interviews are served from a temp dir.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use talentsync::adapters::{
    AnalysisService, FaceAdapter, NullFaceDetector, SilentRecognizer, SpeechAdapter, VoiceAdapter,
};
use talentsync::interviews::{InterviewService, JsonStore, LocalInterviews};
use talentsync::media::ReplayDevices;
use talentsync::session::{SessionCapabilities, SessionConfig, SessionManager};
use talentsync::{create_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Router {
    let config = SessionConfig::default();
    let capabilities = SessionCapabilities {
        devices: Arc::new(ReplayDevices::default()),
        face: FaceAdapter::new(Box::new(NullFaceDetector), config.max_consecutive_no_face),
        voice: VoiceAdapter::new(None),
        speech: SpeechAdapter::new(Box::<SilentRecognizer>::default()),
        analysis: AnalysisService::offline(),
    };
    let session = SessionManager::new(config, capabilities);
    let interviews = InterviewService::offline(LocalInterviews::new(JsonStore::new(dir.path())));
    create_router(AppState::new(session, interviews))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(&app(&dir), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_session_lifecycle_endpoints() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send_json(&app, "POST", "/session/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("idle"));

    let (status, body) = send_json(&app, "POST", "/session/initialize", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["sessionId"].as_str().unwrap().starts_with("session_"));
    assert_eq!(body["status"], "ready");

    let (status, body) = send_json(&app, "GET", "/session/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, _) = send_json(&app, "GET", "/session/report", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No microphone configured
    let (status, body) = send_json(&app, "POST", "/session/start", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("media"));

    let (_, body) = send_json(&app, "GET", "/session/status", None).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["failedCapability"], "media");

    let (status, _) = send_json(&app, "POST", "/session/stop", Some(json!({ "reason": "manual" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send_json(&app, "POST", "/session/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn test_interview_endpoints() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, created) = send_json(
        &app,
        "POST",
        "/interviews",
        Some(json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "555-0100",
            "date": "2024-03-01T10:00:00Z",
            "type": "technical"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "scheduled");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = send_json(&app, "GET", &format!("/interviews/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["candidateName"], "Ada Lovelace");

    let (status, updated) = send_json(
        &app,
        "PATCH",
        &format!("/interviews/{}/status", id),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");

    let (status, page) = send_json(&app, "GET", "/interviews?status=completed&limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, body) = send_json(&app, "GET", "/interviews/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analytics"]["total"], 1);
    assert_eq!(body["analytics"]["byStatus"]["completed"], 1);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/interviews/{}/verify", id),
        Some(json!({ "candidateName": "Ada Lovelace" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Interview is completed");

    let (status, csv) = send(&app, "GET", "/interviews/export.csv?withPhone=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv).unwrap();
    assert!(csv.starts_with("Name,Email,Phone,Date,Type,Status,Notes"));
    assert!(csv.contains(r#""555-0100""#));

    let (status, deleted) = send_json(&app, "DELETE", &format!("/interviews/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], id.as_str());

    let (status, _) = send_json(&app, "GET", &format!("/interviews/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "PATCH",
        "/interviews/missing/status",
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
