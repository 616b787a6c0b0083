//! HTTP control API for a local interview gateway
//!
//! - GET /health - Health check
//! - POST /session/{initialize,start,stop,reset} - Drive the session lifecycle
//! - GET /session/status - Current status and counters
//! - GET /session/report - Final report of the last session
//! - GET|POST /interviews, GET|DELETE /interviews/:id,
//!   PATCH /interviews/:id/status - Interview records
//! - GET /interviews/export.csv - CSV export
//! - GET /interviews/analytics - Counts by status and type
//! - POST /interviews/:id/verify - Check a candidate's interview link

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
