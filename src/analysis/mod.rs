//! Metric calculators
//!
//! Pure, total functions mapping one frame (audio window, dB spectrum, face
//! landmarks, transcript text) to a score. None of them panic; degenerate
//! input yields a neutral value.

pub mod face;
pub mod score;
pub mod transcript;
pub mod voice;

pub use face::{FaceDetection, FaceFrameMetrics, FaceLandmarks, Expressions, HeadPose, Landmark, Point};
pub use score::{BehaviorRates, SuspicionWeights, WarningFlag, WarningThresholds};
pub use transcript::{FollowUpQuestion, InterviewAnalysis, KeyTraits, QuestionKind, ResponseAnalysis};
pub use voice::{AudioFrameMetrics, AudioQualityStatus, Tone, VolumeBand};
