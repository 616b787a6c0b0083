use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/session/initialize", post(handlers::initialize_session))
        .route("/session/start", post(handlers::start_session))
        .route("/session/stop", post(handlers::stop_session))
        .route("/session/reset", post(handlers::reset_session))
        .route("/session/status", get(handlers::session_status))
        .route("/session/report", get(handlers::session_report))
        // Interview records
        .route(
            "/interviews",
            get(handlers::list_interviews).post(handlers::create_interview),
        )
        .route("/interviews/export.csv", get(handlers::export_interviews))
        .route("/interviews/analytics", get(handlers::interview_analytics))
        .route(
            "/interviews/:id",
            get(handlers::get_interview).delete(handlers::delete_interview),
        )
        .route(
            "/interviews/:id/status",
            patch(handlers::update_interview_status),
        )
        .route("/interviews/:id/verify", post(handlers::verify_interview_link))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
