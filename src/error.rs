//! Error types shared across the crate

use thiserror::Error;

use crate::session::SessionStatus;

/// Capability a session depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Camera + microphone acquisition
    Media,
    /// Face-landmark detection
    FaceDetection,
    /// Speech-to-text
    SpeechRecognition,
    /// Microphone analysis and recording
    VoiceAnalysis,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Media => "media",
            Capability::FaceDetection => "face detection",
            Capability::SpeechRecognition => "speech recognition",
            Capability::VoiceAnalysis => "voice analysis",
        };
        f.write_str(name)
    }
}

/// Session lifecycle errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation is not valid from the current state
    #[error("Cannot {operation} while session is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: SessionStatus,
    },

    /// Another lifecycle transition is still running
    #[error("Session transition already in progress")]
    Busy,

    /// A capability failed to load or start
    #[error("{capability} unavailable: {reason}")]
    Capability {
        capability: Capability,
        reason: String,
    },
}

/// Remote API errors (interview CRUD, analysis proxy)
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 401 from the backend
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-2xx response
    #[error("API error {0}: {1}")]
    Status(u16, String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Local fallback storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Runtime configuration store errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Empty configuration key")]
    EmptyKey,

    #[error("Cannot set {key}: {segment} is not an object")]
    NotAnObject { key: String, segment: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
