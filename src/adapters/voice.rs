use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analysis::voice::{self, FFT_SIZE};
use crate::audio::{AudioFrame, RecordedChunk, SessionRecorder};

/// Where and how microphone audio is recorded
#[derive(Debug, Clone)]
pub struct RecordingTarget {
    pub output_dir: PathBuf,
    pub chunk_duration: Duration,
}

/// Latest analyzer window: mono samples normalized to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceWindow {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Final artifact of a voice-analysis run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceArtifact {
    pub frames_received: u64,
    /// Recorded audio chunks, empty when recording is disabled or failed
    pub recording: Vec<RecordedChunk>,
}

#[derive(Default)]
struct SharedWindow {
    samples: Mutex<VecDeque<f32>>,
    sample_rate: AtomicU32,
    fresh: AtomicBool,
}

/// Microphone analyzer: keeps a rolling window of the newest samples and
/// optionally records the raw track to WAV chunks
pub struct VoiceAdapter {
    recording: Option<RecordingTarget>,
    window: Arc<SharedWindow>,
    shutdown: Option<oneshot::Sender<()>>,
    reader: Option<JoinHandle<VoiceArtifact>>,
}

impl VoiceAdapter {
    pub fn new(recording: Option<RecordingTarget>) -> Self {
        Self {
            recording,
            window: Arc::new(SharedWindow::default()),
            shutdown: None,
            reader: None,
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        if let Some(target) = &self.recording {
            std::fs::create_dir_all(&target.output_dir).with_context(|| {
                format!("Failed to create recordings directory {:?}", target.output_dir)
            })?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.reader.is_some()
    }

    /// Start consuming the microphone track
    pub fn start(&mut self, session_id: &str, mut audio_rx: mpsc::Receiver<AudioFrame>) -> Result<()> {
        let mut recorder = match &self.recording {
            Some(target) => Some(SessionRecorder::create(
                session_id,
                &target.output_dir,
                target.chunk_duration,
            )?),
            None => None,
        };

        self.clear_window();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let window = self.window.clone();
        let session = session_id.to_string();

        let reader = tokio::spawn(async move {
            let mut frames = 0u64;
            let mut salvaged = Vec::new();
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    frame = audio_rx.recv() => {
                        let Some(frame) = frame else {
                            debug!("Microphone track ended");
                            break;
                        };
                        frames += 1;
                        push_window(&window, &frame);

                        if let Some(active) = recorder.as_mut() {
                            if let Err(e) = active.write(&frame) {
                                warn!("Recording of session {} stopped: {:#}", session, e);
                                salvaged = active.chunks().to_vec();
                                recorder = None;
                            }
                        }
                    }
                }
            }

            let recording = match recorder {
                Some(active) => active.finish().unwrap_or_else(|e| {
                    warn!("Audio recording of session {} failed: {:#}", session, e);
                    Vec::new()
                }),
                None => salvaged,
            };
            VoiceArtifact {
                frames_received: frames,
                recording,
            }
        });

        self.shutdown = Some(shutdown_tx);
        self.reader = Some(reader);
        info!("Voice analysis started for session {}", session_id);
        Ok(())
    }

    /// Newest analyzer window, or `None` if no audio arrived since the last pull
    pub fn latest_window(&self) -> Option<VoiceWindow> {
        if !self.window.fresh.swap(false, Ordering::AcqRel) {
            return None;
        }
        let samples = lock(&self.window.samples).iter().copied().collect::<Vec<_>>();
        if samples.is_empty() {
            return None;
        }
        Some(VoiceWindow {
            samples,
            sample_rate: self.window.sample_rate.load(Ordering::Acquire),
        })
    }

    /// Stop reading and flush the recording; never fails
    pub async fn stop(&mut self) -> VoiceArtifact {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        let artifact = match self.reader.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!("Voice reader task failed: {}", e);
                VoiceArtifact::default()
            }),
            None => VoiceArtifact::default(),
        };

        self.clear_window();
        artifact
    }

    fn clear_window(&self) {
        lock(&self.window.samples).clear();
        self.window.fresh.store(false, Ordering::Release);
    }
}

fn push_window(window: &SharedWindow, frame: &AudioFrame) {
    let mono = frame.to_mono();
    let normalized = voice::normalize_pcm(&mono.samples);
    {
        let mut samples = lock(&window.samples);
        samples.extend(normalized);
        let excess = samples.len().saturating_sub(FFT_SIZE);
        samples.drain(..excess);
    }
    window.sample_rate.store(frame.sample_rate, Ordering::Release);
    window.fresh.store(true, Ordering::Release);
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ts: u64, value: i16, len: usize) -> AudioFrame {
        AudioFrame {
            samples: vec![value; len],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: ts,
        }
    }

    #[tokio::test]
    async fn test_reader_runs_until_track_ends() {
        let mut adapter = VoiceAdapter::new(None);
        let (tx, rx) = mpsc::channel(8);
        adapter.start("s1", rx).unwrap();

        tx.send(frame(0, 0, FFT_SIZE)).await.unwrap();
        tx.send(frame(128, i16::MAX, 1024)).await.unwrap();
        drop(tx);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let window = adapter.latest_window().expect("window");
        assert_eq!(window.samples.len(), FFT_SIZE);
        assert_eq!(window.samples[FFT_SIZE - 1], 1.0);
        assert_eq!(window.samples[0], 0.0);

        let artifact = adapter.stop().await;
        assert_eq!(artifact.frames_received, 2);
        assert!(artifact.recording.is_empty());
    }

    #[tokio::test]
    async fn test_latest_window_consumes_freshness() {
        let mut adapter = VoiceAdapter::new(None);
        let (tx, rx) = mpsc::channel(8);
        adapter.start("s1", rx).unwrap();

        tx.send(frame(0, i16::MAX, 4096)).await.unwrap();
        // Give the reader a chance to drain the channel
        for _ in 0..50 {
            if adapter.window.fresh.load(Ordering::Acquire) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let window = adapter.latest_window().expect("window");
        assert_eq!(window.samples.len(), FFT_SIZE);
        assert_eq!(window.sample_rate, 16000);
        assert!(adapter.latest_window().is_none());

        adapter.stop().await;
    }

    #[tokio::test]
    async fn test_records_chunks_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut adapter = VoiceAdapter::new(Some(RecordingTarget {
            output_dir: dir.path().to_path_buf(),
            chunk_duration: Duration::from_secs(300),
        }));
        adapter.initialize().unwrap();

        let (tx, rx) = mpsc::channel(8);
        adapter.start("abc", rx).unwrap();
        tx.send(frame(0, 100, 1600)).await.unwrap();
        tx.send(frame(100, 100, 1600)).await.unwrap();
        drop(tx);

        // Reader exits on track end; stop still flushes the recorder
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let artifact = adapter.stop().await;
        assert_eq!(artifact.recording.len(), 1);
        assert_eq!(artifact.recording[0].sample_count, 3200);
        assert_eq!(artifact.recording[0].duration_ms, 200);
        assert!(dir.path().join("abc-audio-000.wav").exists());
    }
}
