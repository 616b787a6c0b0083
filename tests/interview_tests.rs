// Integration tests for interview CRUD with local fallback
//
// Fake backends are in-process axum servers on ephemeral ports; the
// unreachable case points at a closed port.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use talentsync::auth::{AuthEvent, AuthSession};
use talentsync::interviews::{
    CsvColumns, InterviewService, InterviewStatus, InterviewType, JsonStore, ListQuery,
    LocalInterviews, NewInterview, RemoteInterviews,
};
use tempfile::TempDir;

fn new_interview(name: &str) -> NewInterview {
    NewInterview {
        candidate_name: name.to_string(),
        candidate_email: format!("{}@example.com", name.to_lowercase()),
        candidate_phone: "555-0100".to_string(),
        interview_date: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        interview_type: InterviewType::Technical,
        notes: String::new(),
    }
}

fn service(base_url: &str, dir: &TempDir, auth: Arc<AuthSession>) -> InterviewService {
    let remote = RemoteInterviews::new(base_url, Duration::from_secs(2), auth).unwrap();
    InterviewService::new(Some(remote), LocalInterviews::new(JsonStore::new(dir.path())))
}

async fn spawn_backend(app: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

#[derive(Clone, Default)]
struct Backend {
    records: Arc<Mutex<Vec<Value>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
}

async fn create(State(backend): State<Backend>, headers: HeaderMap, Json(mut body): Json<Value>) -> impl IntoResponse {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        backend.auth_headers.lock().unwrap().push(auth.to_string());
    }
    let mut records = backend.records.lock().unwrap();
    body["_id"] = json!(format!("remote-{}", records.len() + 1));
    records.push(body.clone());
    (StatusCode::CREATED, Json(json!({ "interview": body })))
}

async fn list(State(backend): State<Backend>) -> impl IntoResponse {
    let records = backend.records.lock().unwrap().clone();
    Json(json!({ "interviews": records, "total": records.len(), "page": 1, "totalPages": 1 }))
}

async fn fetch(State(backend): State<Backend>, Path(id): Path<String>) -> impl IntoResponse {
    let records = backend.records.lock().unwrap();
    match records.iter().find(|r| r["_id"] == json!(id)) {
        Some(record) => (StatusCode::OK, Json(json!({ "interview": record }))).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Interview not found" }))).into_response(),
    }
}

async fn analytics(State(backend): State<Backend>) -> impl IntoResponse {
    let total = backend.records.lock().unwrap().len();
    Json(json!({ "analytics": { "total": total, "byStatus": { "scheduled": total } } }))
}

async fn verify(
    State(backend): State<Backend>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let records = backend.records.lock().unwrap();
    match records.iter().find(|r| r["_id"] == json!(id)) {
        Some(record) if record["candidateName"] == body["candidateName"] => {
            (StatusCode::OK, Json(json!({ "success": true, "interview": record })))
        }
        Some(_) => (StatusCode::FORBIDDEN, Json(json!({ "message": "Name does not match" }))),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Interview not found" }))),
    }
}

fn backend_router(backend: Backend) -> Router {
    Router::new()
        .route("/api/interviews", post(create).get(list))
        .route("/api/interviews/analytics", get(analytics))
        .route("/api/interviews/verify/:id", post(verify))
        .route("/api/interviews/:id", get(fetch))
        .with_state(backend)
}

#[tokio::test]
async fn test_unreachable_backend_falls_back_to_local() -> Result<()> {
    let dir = TempDir::new()?;
    let interviews = service("http://127.0.0.1:1", &dir, Arc::new(AuthSession::new()));

    let created = interviews.create(new_interview("Ada")).await?;
    assert!(created.id.parse::<i64>().is_ok(), "local ids are timestamps");
    assert_eq!(created.status, InterviewStatus::Scheduled);

    let fetched = interviews.get(&created.id).await?;
    assert_eq!(fetched.as_ref(), Some(&created));

    let second = interviews.create(new_interview("Grace")).await?;
    assert_ne!(second.id, created.id);

    let page = interviews.list(&ListQuery::default()).await?;
    assert_eq!(page.total, 2);

    let updated = interviews
        .update_status(&created.id, InterviewStatus::Completed)
        .await?
        .expect("record exists");
    assert_eq!(updated.status, InterviewStatus::Completed);

    let completed = interviews
        .list(&ListQuery {
            status: Some(InterviewStatus::Completed),
            ..Default::default()
        })
        .await?;
    assert_eq!(completed.interviews.len(), 1);

    assert_eq!(interviews.delete(&second.id).await?, second.id);
    assert!(interviews.get(&second.id).await?.is_none());
    assert!(interviews
        .update_status("missing", InterviewStatus::Cancelled)
        .await?
        .is_none());

    let analytics = interviews.analytics().await?;
    assert_eq!(analytics.total, 1);
    assert_eq!(analytics.by_status.get("completed"), Some(&1));
    assert_eq!(analytics.by_type.get("technical"), Some(&1));

    let verification = interviews.verify_link(&created.id, "ada").await?;
    assert!(!verification.valid, "completed interviews cannot be joined");
    assert!(!interviews.verify_link(&second.id, "Grace").await?.valid);

    let csv = interviews
        .export_csv(&ListQuery::default(), CsvColumns::Standard)
        .await?;
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(r#""Ada","ada@example.com","March 1, 2024, 10:00 AM""#));

    // Records survive a new service over the same directory
    let reopened = InterviewService::offline(LocalInterviews::new(JsonStore::new(dir.path())));
    assert!(reopened.get(&created.id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_remote_results_are_mirrored_locally() -> Result<()> {
    let backend = Backend::default();
    let base = spawn_backend(backend_router(backend.clone())).await?;
    let dir = TempDir::new()?;
    let interviews = service(&base, &dir, Arc::new(AuthSession::with_token("secret")));

    let created = interviews.create(new_interview("Ada")).await?;
    assert_eq!(created.id, "remote-1");
    assert_eq!(created.status, InterviewStatus::Scheduled);
    assert_eq!(
        backend.auth_headers.lock().unwrap().clone(),
        vec!["Bearer secret".to_string()]
    );

    let page = interviews.list(&ListQuery::default()).await?;
    assert_eq!(page.interviews.len(), 1);
    assert_eq!(page.interviews[0].candidate_name, "Ada");

    // Mirrored copy answers while the backend says 404
    let local = interviews.local().get("remote-1").await?;
    assert_eq!(local.map(|r| r.id), Some("remote-1".to_string()));
    assert!(interviews.get("remote-1").await?.is_some());
    assert!(interviews.get("remote-9").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_forces_logout_and_falls_back() -> Result<()> {
    let app = Router::new().fallback(|| async {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token expired" })))
    });
    let base = spawn_backend(app).await?;
    let dir = TempDir::new()?;
    let auth = Arc::new(AuthSession::with_token("stale"));
    let mut auth_events = auth.subscribe();
    let interviews = service(&base, &dir, Arc::clone(&auth));

    let created = interviews.create(new_interview("Ada")).await?;
    assert!(created.id.parse::<i64>().is_ok());
    assert!(!auth.is_authenticated());
    assert_eq!(
        auth_events.recv().await?,
        AuthEvent::LoggedOut { forced: true }
    );
    Ok(())
}

#[tokio::test]
async fn test_analytics_and_link_checks_use_backend() -> Result<()> {
    let backend = Backend::default();
    let base = spawn_backend(backend_router(backend.clone())).await?;
    let dir = TempDir::new()?;
    let interviews = service(&base, &dir, Arc::new(AuthSession::with_token("secret")));

    interviews.create(new_interview("Ada")).await?;
    let analytics = interviews.analytics().await?;
    assert_eq!(analytics.total, 1);
    assert_eq!(analytics.by_status.get("scheduled"), Some(&1));

    let verification = interviews.verify_link("remote-1", "Ada").await?;
    assert!(verification.valid);
    assert_eq!(
        verification.interview.map(|r| r.candidate_name),
        Some("Ada".to_string())
    );

    // The backend's refusal stands, even though the local mirror would match
    let refused = interviews.verify_link("remote-1", "Grace").await?;
    assert!(!refused.valid);
    assert_eq!(refused.message.as_deref(), Some("Name does not match"));
    assert!(interviews.local().get("remote-1").await?.is_some());
    Ok(())
}
