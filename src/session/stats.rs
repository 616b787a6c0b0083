use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Capability;

/// Lifecycle state of the interview session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No session; the pre-initializing condition
    #[default]
    Idle,
    Initializing,
    Ready,
    Recording,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Initializing => "initializing",
            SessionStatus::Ready => "ready",
            SessionStatus::Recording => "recording",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }

    /// States `reset()` may leave from
    pub fn can_reset(&self) -> bool {
        matches!(
            self,
            SessionStatus::Ready | SessionStatus::Completed | SessionStatus::Error
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    #[default]
    Manual,
    /// The duration timer expired
    Timeout,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Manual => f.write_str("manual"),
            StopReason::Timeout => f.write_str("timeout"),
        }
    }
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub status: SessionStatus,

    pub session_id: Option<String>,

    /// When recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Recording duration so far in seconds
    pub duration_secs: f64,

    /// Ticks with a detected face
    pub frames_analyzed: u64,

    /// Final transcript segments received
    pub transcript_segments_count: usize,

    /// Capability that put the session into `error`
    pub failed_capability: Option<Capability>,

    pub error: Option<String>,
}

/// A single final speech-recognition result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Transcribed text
    pub text: String,

    /// When this segment was received
    pub timestamp: DateTime<Utc>,

    /// Seconds since recording started
    pub offset_secs: f64,
}
