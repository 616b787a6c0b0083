use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::video::{NoVideoBackend, VideoBackend, VideoFrame};
use crate::audio::{AudioBackend, AudioBackendConfig, AudioFrame, FileAudioBackend};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuality {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuality {
    pub sample_rate: u32,
    pub channel_count: u16,
}

/// Capture constraints requested from the devices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordingQuality {
    pub video: VideoQuality,
    pub audio: AudioQuality,
}

impl Default for RecordingQuality {
    fn default() -> Self {
        Self {
            video: VideoQuality {
                width: 1280,
                height: 720,
            },
            audio: AudioQuality {
                sample_rate: 48000,
                channel_count: 2,
            },
        }
    }
}

/// Live camera + microphone tracks owned by one session
pub struct MediaStream {
    pub id: Uuid,
    audio: Box<dyn AudioBackend>,
    video: Box<dyn VideoBackend>,
    audio_rx: Option<mpsc::Receiver<AudioFrame>>,
    video_rx: Option<mpsc::Receiver<VideoFrame>>,
}

impl MediaStream {
    /// Start both tracks; a failure on either stops the other
    pub async fn open(
        mut audio: Box<dyn AudioBackend>,
        mut video: Box<dyn VideoBackend>,
    ) -> Result<Self> {
        let audio_rx = audio
            .start()
            .await
            .with_context(|| format!("Failed to start {} microphone track", audio.name()))?;

        let video_rx = match video.start().await {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(stop_err) = audio.stop().await {
                    warn!("Failed to stop microphone track: {}", stop_err);
                }
                return Err(e.context(format!("Failed to start {} camera track", video.name())));
            }
        };

        let id = Uuid::new_v4();
        info!(
            "Media stream {} opened (audio: {}, video: {})",
            id,
            audio.name(),
            video.name()
        );

        Ok(Self {
            id,
            audio,
            video,
            audio_rx: Some(audio_rx),
            video_rx: Some(video_rx),
        })
    }

    pub fn take_audio(&mut self) -> Option<mpsc::Receiver<AudioFrame>> {
        self.audio_rx.take()
    }

    pub fn take_video(&mut self) -> Option<mpsc::Receiver<VideoFrame>> {
        self.video_rx.take()
    }

    pub fn is_live(&self) -> bool {
        self.audio.is_capturing() || self.video.is_capturing()
    }

    /// Stop every track; failures are logged, never returned
    pub async fn stop(&mut self) {
        if let Err(e) = self.audio.stop().await {
            warn!("Failed to stop microphone track: {}", e);
        }
        if let Err(e) = self.video.stop().await {
            warn!("Failed to stop camera track: {}", e);
        }
        self.audio_rx = None;
        self.video_rx = None;
        info!("Media stream {} stopped", self.id);
    }
}

/// Source of camera/microphone streams
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire a stream honoring the requested quality where possible
    async fn get_user_media(&self, quality: &RecordingQuality) -> Result<MediaStream>;
}

/// Replays a WAV file as the microphone, with no camera
#[derive(Debug, Clone, Default)]
pub struct ReplayDevices {
    pub audio_path: Option<PathBuf>,
    pub realtime: bool,
}

#[async_trait::async_trait]
impl MediaDevices for ReplayDevices {
    async fn get_user_media(&self, _quality: &RecordingQuality) -> Result<MediaStream> {
        let Some(path) = &self.audio_path else {
            bail!("No microphone available: capture.audio_file is not configured");
        };

        let audio = FileAudioBackend::new(
            path.clone(),
            AudioBackendConfig {
                realtime: self.realtime,
                ..Default::default()
            },
        );
        MediaStream::open(Box::new(audio), Box::new(NoVideoBackend::default())).await
    }
}
