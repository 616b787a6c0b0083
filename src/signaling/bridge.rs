use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::client::SignalingClient;
use super::messages::{SignalKind, SignalMessage};
use crate::session::SessionEvent;

/// Signal other participants see for a session event, if any
pub fn session_signal(event: &SessionEvent) -> Option<SignalMessage> {
    match event {
        SessionEvent::StatusChanged { status, session_id } => Some(SignalMessage::new(
            SignalKind::InterviewControl,
            json!({ "status": status, "sessionId": session_id }),
        )),
        SessionEvent::Live(live) => live.interim_transcript.as_ref().map(|text| {
            SignalMessage::new(
                SignalKind::TranscriptUpdated,
                json!({ "sessionId": live.session_id, "interim": text }),
            )
        }),
        SessionEvent::Completed(report) => Some(SignalMessage::new(
            SignalKind::AnalysisUpdated,
            json!({
                "sessionId": report.session_id,
                "transcript": report.transcript,
                "analysis": report.analysis,
                "summary": report.summary,
            }),
        )),
        _ => None,
    }
}

/// Relay session events to the signaling channel until the session side closes
pub async fn forward_session_events(
    client: Arc<SignalingClient>,
    mut events: broadcast::Receiver<SessionEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let Some(message) = session_signal(&event) else {
                    continue;
                };
                if let Err(e) = client.send(message.kind, message.data).await {
                    warn!("Failed to relay session event: {:#}", e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!("Signaling relay skipped {} session events", skipped);
            }
            Err(RecvError::Closed) => return,
        }
    }
}
