pub mod adapters;
pub mod aggregate;
pub mod analysis;
pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod interviews;
pub mod media;
pub mod session;
pub mod signaling;

pub use adapters::{
    AnalysisService, FaceAdapter, FaceDetector, LlmClient, SpeechAdapter, SpeechRecognizer,
    VoiceAdapter,
};
pub use audio::{AudioBackend, AudioBackendConfig, AudioFile, AudioFrame, RecordedChunk, SessionRecorder};
pub use auth::AuthSession;
pub use config::{Config, ConfigStore};
pub use error::{ApiError, Capability, ConfigError, SessionError, StoreError};
pub use http::{create_router, AppState};
pub use interviews::{InterviewRecord, InterviewService, InterviewStatus};
pub use session::{
    FinalReport, SessionCapabilities, SessionConfig, SessionEvent, SessionManager, SessionStats,
    SessionStatus, StopReason, TranscriptSegment,
};
pub use signaling::{SignalEvent, SignalingClient};
