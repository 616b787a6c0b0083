use crate::interviews::InterviewService;
use crate::session::SessionManager;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single interview session this gateway drives
    pub session: SessionManager,

    /// Interview records, backend first with local fallback
    pub interviews: Arc<InterviewService>,
}

impl AppState {
    pub fn new(session: SessionManager, interviews: InterviewService) -> Self {
        Self {
            session,
            interviews: Arc::new(interviews),
        }
    }
}
