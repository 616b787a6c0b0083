use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::{RecordingTarget, DEFAULT_MAX_CONSECUTIVE_NO_FACE};
use crate::aggregate::BehaviorConfig;
use crate::analysis::QuestionKind;
use crate::media::RecordingQuality;

/// Configuration for an interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Recording stops with `StopReason::Timeout` after this long
    /// Default: 3600 seconds
    pub max_duration: Duration,

    /// Analysis tick period
    pub tick_interval: Duration,

    /// Constraints passed to the media devices
    pub recording_quality: RecordingQuality,

    /// Behavioral thresholds and score weights
    pub behavior: BehaviorConfig,

    /// Consecutive empty camera frames before a no-face warning
    pub max_consecutive_no_face: u32,

    /// Where microphone audio is recorded (None = no recording)
    pub recordings_dir: Option<PathBuf>,

    /// Duration of each recorded WAV chunk
    pub chunk_duration: Duration,

    /// Question bank for follow-up questions in the final report
    pub question_kind: QuestionKind,

    pub follow_up_count: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(3600),
            tick_interval: Duration::from_secs(1),
            recording_quality: RecordingQuality::default(),
            behavior: BehaviorConfig::default(),
            max_consecutive_no_face: DEFAULT_MAX_CONSECUTIVE_NO_FACE,
            recordings_dir: None,
            chunk_duration: Duration::from_secs(300), // 5 minutes
            question_kind: QuestionKind::default(),
            follow_up_count: 3,
        }
    }
}

impl SessionConfig {
    /// Microphone recording target for the voice adapter
    pub fn recording_target(&self) -> Option<RecordingTarget> {
        self.recordings_dir.as_ref().map(|dir| RecordingTarget {
            output_dir: dir.clone(),
            chunk_duration: self.chunk_duration.max(Duration::from_secs(1)),
        })
    }
}
