use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats::{SessionStatus, StopReason, TranscriptSegment};
use crate::adapters::AnalysisSource;
use crate::aggregate::{AggregateSummary, BehaviorTotals};
use crate::analysis::{
    AudioFrameMetrics, AudioQualityStatus, FaceFrameMetrics, FollowUpQuestion, InterviewAnalysis,
    Tone, VolumeBand, WarningFlag,
};
use crate::audio::RecordedChunk;
use crate::error::Capability;

/// Live overlay severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Normal,
    Warning,
    Suspicious,
}

impl AlertLevel {
    const SUSPICIOUS_ACTIVITY_LIMIT: u64 = 5;
    const OUT_OF_FRAME_LIMIT: u64 = 10;

    pub fn from_totals(totals: &BehaviorTotals) -> Self {
        if totals.suspicious_activity() > Self::SUSPICIOUS_ACTIVITY_LIMIT {
            AlertLevel::Suspicious
        } else if totals.no_face_frames > Self::OUT_OF_FRAME_LIMIT {
            AlertLevel::Warning
        } else {
            AlertLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceFeedback {
    pub metrics: AudioFrameMetrics,
    pub quality: AudioQualityStatus,
    pub band: VolumeBand,
    pub tone: Tone,
    pub pitch_hz: f64,
}

/// Per-tick feedback rendered while recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeedback {
    pub session_id: String,
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
    pub face_detected: bool,
    pub face: Option<FaceFrameMetrics>,
    pub voice: Option<VoiceFeedback>,
    pub interim_transcript: Option<String>,
    pub words_per_minute: f64,
    pub suspicion_score: u8,
    pub alert_level: AlertLevel,
    pub flags: Vec<WarningFlag>,
}

/// Counters reported by the adapters when they stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityStats {
    pub video_frames_analyzed: u64,
    pub no_face_alerts: u32,
    pub audio_frames_received: u64,
    pub speech_restarts: u32,
    pub speech_errors: u32,
}

/// Immutable result of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub stop_reason: StopReason,
    pub transcript: String,
    pub segments: Vec<TranscriptSegment>,
    pub summary: AggregateSummary,
    pub analysis: InterviewAnalysis,
    pub analysis_source: AnalysisSource,
    pub follow_up_questions: Vec<FollowUpQuestion>,
    /// Recorded microphone chunks
    pub recording: Vec<RecordedChunk>,
    pub capabilities: CapabilityStats,
}

/// Events broadcast by the session manager
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged {
        status: SessionStatus,
        session_id: Option<String>,
    },
    Live(LiveFeedback),
    /// Face missing for the configured number of consecutive frames
    NoFace { consecutive: u32 },
    /// Flag newly raised during recording
    Warning(WarningFlag),
    /// Capability failure during initialize or start
    CapabilityFailed {
        capability: Capability,
        reason: String,
    },
    Completed(Box<FinalReport>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_levels() {
        let mut totals = BehaviorTotals::default();
        assert_eq!(AlertLevel::from_totals(&totals), AlertLevel::Normal);

        totals.no_face_frames = 11;
        assert_eq!(AlertLevel::from_totals(&totals), AlertLevel::Warning);

        totals.suspicious_movements = 3;
        totals.unusual_expressions = 3;
        assert_eq!(AlertLevel::from_totals(&totals), AlertLevel::Suspicious);
    }
}
