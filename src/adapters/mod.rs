//! Capability adapters
//!
//! Each adapter wraps one external capability behind the session lifecycle:
//! `initialize`, `start` against the session's media, a per-tick pull and a
//! `stop` returning the run's artifact. Start failures are returned to the
//! session manager; anything that goes wrong after that is logged and
//! degrades to an empty result.

pub mod face;
pub mod llm;
pub mod speech;
pub mod voice;

pub use face::{
    FaceAdapter, FaceArtifact, FaceDetector, FaceOutcome, NullFaceDetector,
    DEFAULT_MAX_CONSECUTIVE_NO_FACE,
};
pub use llm::{AnalysisService, AnalysisSource, Analyzed, LlmClient, LlmSettings, TranscriptAnalyzer};
pub use speech::{
    RecognitionEvent, SilentRecognizer, SpeechAdapter, SpeechArtifact, SpeechRecognizer,
    TranscriptUpdate,
};
pub use voice::{RecordingTarget, VoiceAdapter, VoiceArtifact, VoiceWindow};
