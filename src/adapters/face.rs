use anyhow::{bail, Result};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::analysis::FaceDetection;
use crate::media::VideoFrame;

/// Default number of consecutive empty frames before raising a no-face alert
pub const DEFAULT_MAX_CONSECUTIVE_NO_FACE: u32 = 3;

/// Face-landmark detector provided by the host
///
/// `detect` returns `Ok(None)` when the frame contains no face.
#[async_trait::async_trait]
pub trait FaceDetector: Send + Sync {
    /// Load detection models
    async fn load(&mut self) -> Result<()>;

    async fn detect(&mut self, frame: &VideoFrame) -> Result<Option<FaceDetection>>;

    fn name(&self) -> &str;
}

/// Result of analyzing the latest camera frame
#[derive(Debug, Clone, PartialEq)]
pub enum FaceOutcome {
    /// No new camera frame since the previous pull
    NoFrame,
    Detected(FaceDetection),
    NoFace { consecutive: u32 },
    /// Consecutive no-face count reached the configured threshold
    NoFaceAlert { consecutive: u32 },
    Failed(String),
}

/// Final artifact of a face-analysis run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceArtifact {
    pub frames_analyzed: u64,
    pub no_face_alerts: u32,
}

/// Wraps a `FaceDetector` behind the session lifecycle
pub struct FaceAdapter {
    detector: Box<dyn FaceDetector>,
    max_consecutive_no_face: u32,
    loaded: bool,
    video_rx: Option<mpsc::Receiver<VideoFrame>>,
    consecutive_no_face: u32,
    artifact: FaceArtifact,
}

impl FaceAdapter {
    pub fn new(detector: Box<dyn FaceDetector>, max_consecutive_no_face: u32) -> Self {
        Self {
            detector,
            max_consecutive_no_face: max_consecutive_no_face.max(1),
            loaded: false,
            video_rx: None,
            consecutive_no_face: 0,
            artifact: FaceArtifact::default(),
        }
    }

    pub fn name(&self) -> &str {
        self.detector.name()
    }

    pub async fn initialize(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.detector.load().await?;
        self.loaded = true;
        info!("Face detector loaded: {}", self.detector.name());
        Ok(())
    }

    pub fn start(&mut self, video_rx: mpsc::Receiver<VideoFrame>) -> Result<()> {
        if !self.loaded {
            bail!("Face detector {} is not loaded", self.detector.name());
        }
        self.video_rx = Some(video_rx);
        self.consecutive_no_face = 0;
        self.artifact = FaceArtifact::default();
        Ok(())
    }

    /// Analyze the most recent queued frame, dropping older ones
    pub async fn next_outcome(&mut self) -> FaceOutcome {
        let Some(frame) = self.latest_frame() else {
            return FaceOutcome::NoFrame;
        };

        self.artifact.frames_analyzed += 1;
        match self.detector.detect(&frame).await {
            Ok(Some(detection)) => {
                self.consecutive_no_face = 0;
                FaceOutcome::Detected(detection)
            }
            Ok(None) => {
                self.consecutive_no_face += 1;
                let consecutive = self.consecutive_no_face;
                if consecutive == self.max_consecutive_no_face {
                    self.artifact.no_face_alerts += 1;
                    warn!("No face detected for {} consecutive frames", consecutive);
                    FaceOutcome::NoFaceAlert { consecutive }
                } else {
                    FaceOutcome::NoFace { consecutive }
                }
            }
            Err(e) => {
                debug!("Face detection failed on frame at {}ms: {}", frame.timestamp_ms, e);
                FaceOutcome::Failed(e.to_string())
            }
        }
    }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        let rx = self.video_rx.as_mut()?;
        let mut latest = None;
        loop {
            match rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Camera track ended");
                    self.video_rx = None;
                    break;
                }
            }
        }
        latest
    }

    pub fn stop(&mut self) -> FaceArtifact {
        self.video_rx = None;
        self.consecutive_no_face = 0;
        std::mem::take(&mut self.artifact)
    }
}

/// Detector for hosts without a landmark model: every frame has no face
#[derive(Debug, Default)]
pub struct NullFaceDetector;

#[async_trait::async_trait]
impl FaceDetector for NullFaceDetector {
    async fn load(&mut self) -> Result<()> {
        warn!("No face-landmark model available, face analysis disabled");
        Ok(())
    }

    async fn detect(&mut self, _frame: &VideoFrame) -> Result<Option<FaceDetection>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct ScriptedDetector {
        script: VecDeque<Option<FaceDetection>>,
    }

    #[async_trait::async_trait]
    impl FaceDetector for ScriptedDetector {
        async fn load(&mut self) -> Result<()> {
            Ok(())
        }

        async fn detect(&mut self, _frame: &VideoFrame) -> Result<Option<FaceDetection>> {
            Ok(self.script.pop_front().flatten())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn frame(ts: u64) -> VideoFrame {
        VideoFrame {
            width: 4,
            height: 4,
            timestamp_ms: ts,
            data: Arc::from(vec![0u8; 64]),
        }
    }

    #[tokio::test]
    async fn test_no_face_alert_after_threshold() {
        let detector = ScriptedDetector {
            script: VecDeque::from(vec![None, None, None, None]),
        };
        let mut adapter = FaceAdapter::new(Box::new(detector), 3);
        adapter.initialize().await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        adapter.start(rx).unwrap();

        let mut outcomes = Vec::new();
        for i in 0..4 {
            tx.send(frame(i)).await.unwrap();
            outcomes.push(adapter.next_outcome().await);
        }

        assert_eq!(outcomes[0], FaceOutcome::NoFace { consecutive: 1 });
        assert_eq!(outcomes[2], FaceOutcome::NoFaceAlert { consecutive: 3 });
        assert_eq!(outcomes[3], FaceOutcome::NoFace { consecutive: 4 });
        assert_eq!(adapter.stop().no_face_alerts, 1);
    }

    #[tokio::test]
    async fn test_start_requires_loaded_detector() {
        let detector = ScriptedDetector {
            script: VecDeque::new(),
        };
        let mut adapter = FaceAdapter::new(Box::new(detector), 3);
        let (_tx, rx) = mpsc::channel(1);
        assert!(adapter.start(rx).is_err());
    }

    #[tokio::test]
    async fn test_no_frame_when_queue_empty() {
        let detector = ScriptedDetector {
            script: VecDeque::new(),
        };
        let mut adapter = FaceAdapter::new(Box::new(detector), 3);
        adapter.initialize().await.unwrap();
        let (_tx, rx) = mpsc::channel(1);
        adapter.start(rx).unwrap();
        assert_eq!(adapter.next_outcome().await, FaceOutcome::NoFrame);
    }
}
