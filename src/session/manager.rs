use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::report::{AlertLevel, CapabilityStats, FinalReport, LiveFeedback, SessionEvent, VoiceFeedback};
use super::stats::{SessionStats, SessionStatus, StopReason, TranscriptSegment};
use crate::adapters::{
    AnalysisService, FaceAdapter, FaceOutcome, SpeechAdapter, TranscriptUpdate, VoiceAdapter,
    VoiceWindow,
};
use crate::aggregate::SessionAggregates;
use crate::analysis::transcript;
use crate::analysis::voice::{self, AudioFrameMetrics, FFT_SIZE};
use crate::analysis::WarningFlag;
use crate::error::{Capability, SessionError};
use crate::media::{MediaDevices, MediaStream};

/// Externally provided capabilities, injected at construction
pub struct SessionCapabilities {
    pub devices: Arc<dyn MediaDevices>,
    pub face: FaceAdapter,
    pub voice: VoiceAdapter,
    pub speech: SpeechAdapter,
    pub analysis: AnalysisService,
}

struct Adapters {
    face: FaceAdapter,
    voice: VoiceAdapter,
    speech: SpeechAdapter,
}

/// The recording in progress (or just finished)
struct ActiveRecording {
    started_at: DateTime<Utc>,
    started: Instant,
    stream: Option<MediaStream>,
    tick: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
    segments: Vec<TranscriptSegment>,
    interim: Option<String>,
    frames_analyzed: u64,
    raised_flags: HashSet<WarningFlag>,
}

#[derive(Default)]
struct SessionState {
    status: SessionStatus,
    session_id: Option<String>,
    recording: Option<ActiveRecording>,
    aggregates: SessionAggregates,
    report: Option<FinalReport>,
    failure: Option<(Capability, String)>,
}

struct Inner {
    config: SessionConfig,
    devices: Arc<dyn MediaDevices>,
    analysis: AnalysisService,
    adapters: Mutex<Adapters>,
    state: Mutex<SessionState>,
    transitioning: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

/// Clears the transition flag when the transition ends, however it ends
struct TransitionGuard<'a>(&'a AtomicBool);

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one interview session at a time
///
/// Lifecycle transitions are serialized: a transition attempted while
/// another is running fails with `SessionError::Busy` instead of waiting.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, capabilities: SessionCapabilities) -> Self {
        let (events, _) = broadcast::channel(256);
        let aggregates = SessionAggregates::new(config.behavior);
        Self {
            inner: Arc::new(Inner {
                config,
                devices: capabilities.devices,
                analysis: capabilities.analysis,
                adapters: Mutex::new(Adapters {
                    face: capabilities.face,
                    voice: capabilities.voice,
                    speech: capabilities.speech,
                }),
                state: Mutex::new(SessionState {
                    aggregates,
                    ..Default::default()
                }),
                transitioning: AtomicBool::new(false),
                events,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn analysis(&self) -> &AnalysisService {
        &self.inner.analysis
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.state.lock().await.status
    }

    /// Final report of the last completed session
    pub async fn report(&self) -> Option<FinalReport> {
        self.inner.state.lock().await.report.clone()
    }

    pub async fn stats(&self) -> SessionStats {
        let state = self.inner.state.lock().await;
        let (started_at, duration_secs, frames_analyzed, segments) = match &state.recording {
            Some(recording) => (
                Some(recording.started_at),
                recording.started.elapsed().as_secs_f64(),
                recording.frames_analyzed,
                recording.segments.len(),
            ),
            None => (None, 0.0, 0, 0),
        };

        SessionStats {
            status: state.status,
            session_id: state.session_id.clone(),
            started_at,
            duration_secs: state
                .report
                .as_ref()
                .map(|r| r.duration_secs)
                .unwrap_or(duration_secs),
            frames_analyzed,
            transcript_segments_count: segments,
            failed_capability: state.failure.as_ref().map(|(c, _)| *c),
            error: state.failure.as_ref().map(|(_, reason)| reason.clone()),
        }
    }

    /// Load every capability; returns the new session id
    pub async fn initialize(&self) -> Result<String, SessionError> {
        let _guard = self.begin_transition()?;

        {
            let mut state = self.inner.state.lock().await;
            if state.status != SessionStatus::Idle {
                return Err(SessionError::InvalidTransition {
                    operation: "initialize",
                    status: state.status,
                });
            }
            state.status = SessionStatus::Initializing;
        }
        self.emit_status(SessionStatus::Initializing, None);
        info!("Initializing interview session");

        let failure = {
            let mut adapters = self.inner.adapters.lock().await;
            let Adapters { face, voice, speech } = &mut *adapters;
            let (face_result, speech_result) = tokio::join!(face.initialize(), speech.initialize());

            if let Err(e) = face_result {
                Some((Capability::FaceDetection, format!("{:#}", e)))
            } else if let Err(e) = speech_result {
                Some((Capability::SpeechRecognition, format!("{:#}", e)))
            } else if let Err(e) = voice.initialize() {
                Some((Capability::VoiceAnalysis, format!("{:#}", e)))
            } else {
                None
            }
        };

        if let Some((capability, reason)) = failure {
            return Err(self.fail(capability, reason).await);
        }

        let session_id = format!("session_{}", Utc::now().timestamp_millis());
        {
            let mut state = self.inner.state.lock().await;
            state.status = SessionStatus::Ready;
            state.session_id = Some(session_id.clone());
            state.aggregates.reset();
        }
        self.emit_status(SessionStatus::Ready, Some(session_id.clone()));
        info!("Session {} ready", session_id);
        Ok(session_id)
    }

    /// Acquire media, start every adapter and the timers
    pub async fn start(&self) -> Result<(), SessionError> {
        let _guard = self.begin_transition()?;

        let session_id = {
            let state = self.inner.state.lock().await;
            match (&state.status, &state.session_id) {
                (SessionStatus::Ready, Some(id)) => id.clone(),
                _ => {
                    return Err(SessionError::InvalidTransition {
                        operation: "start",
                        status: state.status,
                    })
                }
            }
        };

        let mut stream = match self
            .inner
            .devices
            .get_user_media(&self.inner.config.recording_quality)
            .await
        {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(Capability::Media, format!("{:#}", e)).await),
        };

        let (Some(audio_rx), Some(video_rx)) = (stream.take_audio(), stream.take_video()) else {
            stream.stop().await;
            return Err(self
                .fail(Capability::Media, "media stream has no tracks".to_string())
                .await);
        };

        let failure = {
            let mut adapters = self.inner.adapters.lock().await;
            if let Err(e) = adapters.face.start(video_rx) {
                Some((Capability::FaceDetection, format!("{:#}", e)))
            } else if let Err(e) = adapters.voice.start(&session_id, audio_rx) {
                adapters.face.stop();
                Some((Capability::VoiceAnalysis, format!("{:#}", e)))
            } else if let Err(e) = adapters.speech.start().await {
                adapters.face.stop();
                adapters.voice.stop().await;
                Some((Capability::SpeechRecognition, format!("{:#}", e)))
            } else {
                None
            }
        };

        if let Some((capability, reason)) = failure {
            stream.stop().await;
            return Err(self.fail(capability, reason).await);
        }

        {
            let mut state = self.inner.state.lock().await;
            state.aggregates.reset();
            state.report = None;
            state.status = SessionStatus::Recording;
            state.recording = Some(ActiveRecording {
                started_at: Utc::now(),
                started: Instant::now(),
                stream: Some(stream),
                tick: Some(self.spawn_tick(session_id.clone())),
                timer: Some(self.spawn_timer(session_id.clone())),
                segments: Vec::new(),
                interim: None,
                frames_analyzed: 0,
                raised_flags: HashSet::new(),
            });
        }

        self.emit_status(SessionStatus::Recording, Some(session_id.clone()));
        info!(
            "Recording session {} (max {}s)",
            session_id,
            self.inner.config.max_duration.as_secs()
        );
        Ok(())
    }

    /// Stop recording and assemble the final report
    pub async fn stop(&self, reason: StopReason) -> Result<FinalReport, SessionError> {
        self.finish(reason, None).await
    }

    /// `expired` is the session whose duration timer is calling; that
    /// timer is the running task and must not be aborted. Every other stop
    /// cancels the timer.
    async fn finish(&self, reason: StopReason, expired: Option<&str>) -> Result<FinalReport, SessionError> {
        let _guard = self.begin_transition()?;

        let (session_id, tick, timer, stream) = {
            let mut state = self.inner.state.lock().await;
            let status = state.status;
            let session_id = state.session_id.clone();
            match (status, session_id, state.recording.as_mut()) {
                (SessionStatus::Recording, Some(id), Some(recording))
                    if expired.map_or(true, |expired| expired == id) =>
                {
                    (
                        id,
                        recording.tick.take(),
                        recording.timer.take(),
                        recording.stream.take(),
                    )
                }
                _ => {
                    return Err(SessionError::InvalidTransition {
                        operation: "stop",
                        status,
                    })
                }
            }
        };

        info!("Stopping session {} ({})", session_id, reason);

        if let Some(tick) = tick {
            tick.abort();
        }
        if let Some(timer) = timer {
            if expired.is_none() {
                timer.abort();
            }
        }

        let (face, voice, speech, updates) = {
            let mut adapters = self.inner.adapters.lock().await;
            let face = adapters.face.stop();
            let voice = adapters.voice.stop().await;
            let speech = adapters.speech.stop().await;
            let updates = adapters.speech.drain_updates();
            (face, voice, speech, updates)
        };

        if let Some(mut stream) = stream {
            stream.stop().await;
        }

        let (transcript, segments, summary, started_at, duration_secs) = {
            let mut state = self.inner.state.lock().await;
            let SessionState {
                recording,
                aggregates,
                ..
            } = &mut *state;
            let Some(recording) = recording.as_mut() else {
                return Err(SessionError::InvalidTransition {
                    operation: "stop",
                    status: SessionStatus::Recording,
                });
            };

            for update in updates {
                if let TranscriptUpdate::Final(text) = update {
                    apply_final(recording, aggregates, text);
                }
            }
            recording.interim = None;

            let duration_secs = recording.started.elapsed().as_secs_f64();
            (
                aggregates.voice.transcript().to_string(),
                recording.segments.clone(),
                aggregates.summary(duration_secs),
                recording.started_at,
                duration_secs,
            )
        };

        let analysis = self.inner.analysis.analyze_interview(&transcript).await;
        let questions = self
            .inner
            .analysis
            .generate_follow_up_questions(
                &transcript,
                self.inner.config.question_kind,
                self.inner.config.follow_up_count,
            )
            .await;

        let report = FinalReport {
            session_id: session_id.clone(),
            started_at,
            ended_at: Utc::now(),
            duration_secs,
            stop_reason: reason,
            transcript,
            segments,
            summary,
            analysis: analysis.value,
            analysis_source: analysis.source,
            follow_up_questions: questions.value,
            recording: voice.recording,
            capabilities: CapabilityStats {
                video_frames_analyzed: face.frames_analyzed,
                no_face_alerts: face.no_face_alerts,
                audio_frames_received: voice.frames_received,
                speech_restarts: speech.restarts,
                speech_errors: speech.errors,
            },
        };

        {
            let mut state = self.inner.state.lock().await;
            state.status = SessionStatus::Completed;
            state.report = Some(report.clone());
        }

        self.emit_status(SessionStatus::Completed, Some(session_id.clone()));
        let _ = self
            .inner
            .events
            .send(SessionEvent::Completed(Box::new(report.clone())));
        info!(
            "Session {} completed: suspicion score {}, analysis source {:?}",
            session_id, report.summary.behavioral.suspicion_score, report.analysis_source
        );
        Ok(report)
    }

    /// Release everything and return to idle
    pub async fn reset(&self) -> Result<(), SessionError> {
        let _guard = self.begin_transition()?;

        let recording = {
            let mut state = self.inner.state.lock().await;
            match state.status {
                SessionStatus::Idle => return Ok(()),
                status if !status.can_reset() => {
                    return Err(SessionError::InvalidTransition {
                        operation: "reset",
                        status,
                    })
                }
                _ => {}
            }
            state.recording.take()
        };

        if let Some(mut recording) = recording {
            for handle in [recording.tick.take(), recording.timer.take()].into_iter().flatten() {
                handle.abort();
            }
            if let Some(mut stream) = recording.stream.take() {
                stream.stop().await;
            }
        }

        {
            let mut adapters = self.inner.adapters.lock().await;
            adapters.face.stop();
            if adapters.voice.is_running() {
                adapters.voice.stop().await;
            }
            if adapters.speech.is_active() {
                adapters.speech.stop().await;
            }
            adapters.speech.drain_updates();
        }

        {
            let mut state = self.inner.state.lock().await;
            state.aggregates.reset();
            state.status = SessionStatus::Idle;
            state.session_id = None;
            state.report = None;
            state.failure = None;
        }

        self.emit_status(SessionStatus::Idle, None);
        info!("Session reset");
        Ok(())
    }

    fn begin_transition(&self) -> Result<TransitionGuard<'_>, SessionError> {
        self.inner
            .transitioning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(TransitionGuard(&self.inner.transitioning))
    }

    async fn fail(&self, capability: Capability, reason: String) -> SessionError {
        error!("{} failed: {}", capability, reason);
        let session_id = {
            let mut state = self.inner.state.lock().await;
            state.status = SessionStatus::Error;
            state.failure = Some((capability, reason.clone()));
            state.session_id.clone()
        };
        let _ = self.inner.events.send(SessionEvent::CapabilityFailed {
            capability,
            reason: reason.clone(),
        });
        self.emit_status(SessionStatus::Error, session_id);
        SessionError::Capability { capability, reason }
    }

    fn emit_status(&self, status: SessionStatus, session_id: Option<String>) {
        let _ = self
            .inner
            .events
            .send(SessionEvent::StatusChanged { status, session_id });
    }

    fn spawn_tick(&self, session_id: String) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.tick_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(manager) = upgrade(&weak) else {
                    break;
                };
                manager.tick(&session_id).await;
            }
        })
    }

    fn spawn_timer(&self, session_id: String) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let max_duration = self.inner.config.max_duration;
        tokio::spawn(async move {
            tokio::time::sleep(max_duration).await;
            let Some(manager) = upgrade(&weak) else {
                return;
            };
            info!("Session {} reached its maximum duration", session_id);
            if let Err(e) = manager.finish(StopReason::Timeout, Some(&session_id)).await {
                warn!("Automatic stop of session {} failed: {}", session_id, e);
            }
        })
    }

    /// One analysis pass over the latest frame of every adapter
    async fn tick(&self, session_id: &str) {
        let (face, window, updates) = {
            let mut adapters = self.inner.adapters.lock().await;
            let face = adapters.face.next_outcome().await;
            let window = adapters.voice.latest_window();
            let updates = adapters.speech.drain_updates();
            (face, window, updates)
        };

        let mut events = Vec::new();
        {
            let mut state = self.inner.state.lock().await;
            if state.status != SessionStatus::Recording
                || state.session_id.as_deref() != Some(session_id)
            {
                debug!("Discarding tick results for stale session {}", session_id);
                return;
            }

            let SessionState {
                recording,
                aggregates,
                ..
            } = &mut *state;
            let Some(recording) = recording.as_mut() else {
                return;
            };

            let mut face_metrics = None;
            match face {
                FaceOutcome::Detected(detection) => {
                    let metrics = aggregates.behavior.score_frame(&detection);
                    aggregates.behavior.record(&metrics);
                    recording.frames_analyzed += 1;
                    face_metrics = Some(metrics);
                }
                FaceOutcome::NoFace { .. } => aggregates.behavior.record_no_face(),
                FaceOutcome::NoFaceAlert { consecutive } => {
                    aggregates.behavior.record_no_face();
                    events.push(SessionEvent::NoFace { consecutive });
                }
                FaceOutcome::Failed(reason) => {
                    debug!("Skipping face frame: {}", reason);
                    aggregates.behavior.record_failure();
                }
                FaceOutcome::NoFrame => {}
            }

            let voice_feedback = window.map(|window| {
                let feedback = voice_feedback(&window);
                aggregates.voice.record(&feedback.metrics);
                feedback
            });

            for update in updates {
                match update {
                    TranscriptUpdate::Final(text) => apply_final(recording, aggregates, text),
                    TranscriptUpdate::Interim(text) => recording.interim = Some(text),
                }
            }

            let summary = aggregates.behavior.summary();
            for flag in &summary.flags {
                if recording.raised_flags.insert(*flag) {
                    warn!("Session {}: {}", session_id, flag);
                    events.push(SessionEvent::Warning(*flag));
                }
            }

            let elapsed = recording.started.elapsed().as_secs_f64();
            let remaining = (self.inner.config.max_duration.as_secs_f64() - elapsed).max(0.0);
            events.push(SessionEvent::Live(LiveFeedback {
                session_id: session_id.to_string(),
                elapsed_secs: elapsed,
                remaining_secs: remaining,
                face_detected: face_metrics.is_some(),
                face: face_metrics,
                voice: voice_feedback,
                interim_transcript: recording.interim.clone(),
                words_per_minute: transcript::speaking_pace(aggregates.voice.transcript(), elapsed),
                suspicion_score: summary.suspicion_score,
                alert_level: AlertLevel::from_totals(&summary.totals),
                flags: summary.flags.clone(),
            }));
        }

        for event in events {
            let _ = self.inner.events.send(event);
        }
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<SessionManager> {
    weak.upgrade().map(|inner| SessionManager { inner })
}

fn apply_final(recording: &mut ActiveRecording, aggregates: &mut SessionAggregates, text: String) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    aggregates.voice.append_transcript(text);
    recording.segments.push(TranscriptSegment {
        text: text.to_string(),
        timestamp: Utc::now(),
        offset_secs: recording.started.elapsed().as_secs_f64(),
    });
    recording.interim = None;
}

fn voice_feedback(window: &VoiceWindow) -> VoiceFeedback {
    let spectrum = voice::power_spectrum_db(&window.samples);
    let metrics = AudioFrameMetrics {
        volume: voice::calculate_volume(&window.samples),
        noise_level: voice::calculate_noise_level(&window.samples),
        clarity: voice::calculate_clarity(&spectrum),
        steadiness: voice::calculate_steadiness(&window.samples),
    };
    VoiceFeedback {
        metrics,
        quality: voice::audio_quality_status(&metrics),
        band: voice::volume_band(metrics.volume),
        tone: voice::classify_tone(&spectrum, window.sample_rate, FFT_SIZE),
        pitch_hz: voice::estimate_pitch(&spectrum, window.sample_rate, FFT_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{NullFaceDetector, SilentRecognizer, DEFAULT_MAX_CONSECUTIVE_NO_FACE};
    use crate::media::ReplayDevices;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn write_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..16000 {
            writer.write_sample(((i % 100) as i16 - 50) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn manager(audio: PathBuf) -> SessionManager {
        // Ticks are driven by hand
        let config = SessionConfig {
            tick_interval: Duration::from_secs(60),
            ..Default::default()
        };
        SessionManager::new(
            config,
            SessionCapabilities {
                devices: Arc::new(ReplayDevices {
                    audio_path: Some(audio),
                    realtime: false,
                }),
                face: FaceAdapter::new(Box::new(NullFaceDetector), DEFAULT_MAX_CONSECUTIVE_NO_FACE),
                voice: VoiceAdapter::new(None),
                speech: SpeechAdapter::new(Box::<SilentRecognizer>::default()),
                analysis: AnalysisService::offline(),
            },
        )
    }

    fn drain(events: &mut broadcast::Receiver<SessionEvent>) {
        while events.try_recv().is_ok() {}
    }

    #[tokio::test]
    async fn test_tick_for_another_session_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mic.wav");
        write_wav(&path);
        let session = manager(path);
        let mut events = session.subscribe();

        let session_id = session.initialize().await.unwrap();
        session.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drain(&mut events);

        session.tick("session_0").await;
        assert!(events.try_recv().is_err(), "stale tick emitted an event");

        session.tick(&session_id).await;
        assert!(matches!(events.try_recv(), Ok(SessionEvent::Live(_))));

        session.stop(StopReason::Manual).await.unwrap();
        drain(&mut events);

        // Same id, but no longer recording
        session.tick(&session_id).await;
        assert!(events.try_recv().is_err());
        assert_eq!(session.status().await, SessionStatus::Completed);
    }
}
