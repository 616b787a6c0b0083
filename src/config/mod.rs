mod store;

pub use store::{resolve_base_url, ConfigChange, ConfigStore, Validation};

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::aggregate::BehaviorConfig;
use crate::analysis::QuestionKind;
use crate::media::RecordingQuality;
use crate::session::SessionConfig;

/// Environment variables `TALENTSYNC__SECTION__KEY` override file values
pub const ENV_PREFIX: &str = "TALENTSYNC";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub llm: LlmConfig,
    pub interview: InterviewConfig,
    /// Behavioral thresholds; all are calibration constants
    pub detection: BehaviorConfig,
    pub storage: StorageConfig,
    pub signaling: SignalingConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "talentsync".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Backend API location and credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Explicit backend URL; wins over hostname resolution
    pub base_url: Option<String>,
    /// Hostname the client is served from
    pub hostname: String,
    /// Origin the client is served from
    pub origin: String,
    pub timeout_secs: u64,
    /// Bearer token for the backend
    pub token: Option<String>,
    /// Never call the backend; serve everything locally
    pub offline: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            hostname: "localhost".to_string(),
            origin: "http://localhost:3000".to_string(),
            timeout_secs: 15,
            token: None,
            offline: false,
        }
    }
}

impl ApiConfig {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => resolve_base_url(&self.hostname, &self.origin),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4".to_string(),
            max_tokens: 1000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub max_duration_secs: u64,
    pub tick_interval_ms: u64,
    pub recording_quality: RecordingQuality,
    pub question_kind: QuestionKind,
    pub follow_up_count: usize,
    /// Consecutive empty camera frames before a no-face warning
    pub max_consecutive_no_face: u32,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 3600,
            tick_interval_ms: 1000,
            recording_quality: RecordingQuality::default(),
            question_kind: QuestionKind::default(),
            follow_up_count: 3,
            max_consecutive_no_face: crate::adapters::DEFAULT_MAX_CONSECUTIVE_NO_FACE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Local fallback store directory
    pub data_dir: PathBuf,
    /// Microphone recordings; unset disables recording
    pub recordings_path: Option<PathBuf>,
    pub chunk_duration_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            recordings_path: None,
            chunk_duration_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    pub enabled: bool,
    pub url: String,
    pub connect_timeout_secs: u64,
    pub max_reconnect_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_secs: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "nats://localhost:4222".to_string(),
            connect_timeout_secs: 10,
            max_reconnect_attempts: 5,
            base_delay_ms: 1000,
            max_delay_secs: 30,
        }
    }
}

/// Offline media source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// WAV file replayed as the microphone
    pub audio_file: Option<PathBuf>,
    /// Replay at recording speed
    pub realtime: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            audio_file: None,
            realtime: true,
        }
    }
}

impl Config {
    /// Load `path` (any extension `config` understands) plus environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_duration: Duration::from_secs(self.interview.max_duration_secs),
            tick_interval: Duration::from_millis(self.interview.tick_interval_ms.max(1)),
            recording_quality: self.interview.recording_quality,
            behavior: self.detection,
            max_consecutive_no_face: self.interview.max_consecutive_no_face,
            recordings_dir: self.storage.recordings_path.clone(),
            chunk_duration: Duration::from_secs(self.storage.chunk_duration_secs),
            question_kind: self.interview.question_kind,
            follow_up_count: self.interview.follow_up_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.api.timeout_secs, 15);
        assert_eq!(cfg.interview.max_duration_secs, 3600);
        assert_eq!(cfg.api.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_load_toml_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talentsync.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://api.example.com/"

[interview]
max_duration_secs = 600
max_consecutive_no_face = 5

[detection]
look_away_threshold = 0.25
"#,
        )
        .unwrap();

        let cfg = Config::load(path.with_extension("").to_str().unwrap()).unwrap();
        assert_eq!(cfg.api.base_url(), "https://api.example.com");

        let session = cfg.session_config();
        assert_eq!(session.max_duration, Duration::from_secs(600));
        assert_eq!(session.behavior.look_away_threshold, 0.25);
        assert_eq!(session.behavior.movement_threshold_px, 20.0);
        assert_eq!(session.max_consecutive_no_face, 5);
    }
}
