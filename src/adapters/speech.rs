use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pause before restarting recognition after a natural end
pub const RESTART_DELAY: Duration = Duration::from_millis(250);

/// Events produced by one recognition run
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    Result { text: String, is_final: bool },
    Error(String),
    /// The recognizer finished on its own (silence, service limit)
    End,
}

/// Speech-to-text engine provided by the host
///
/// Each `start` begins a new recognition run whose events arrive on the
/// returned channel until `End` or the channel closes.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn initialize(&mut self) -> Result<()>;

    async fn start(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>>;

    async fn stop(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptUpdate {
    Final(String),
    Interim(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeechArtifact {
    pub restarts: u32,
    pub errors: u32,
}

#[derive(Default)]
struct Counters {
    restarts: AtomicU32,
    errors: AtomicU32,
}

/// Continuous dictation over a recognizer that ends on its own
pub struct SpeechAdapter {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    active: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    counters: Arc<Counters>,
    task: Option<JoinHandle<Box<dyn SpeechRecognizer>>>,
    updates_rx: Option<mpsc::UnboundedReceiver<TranscriptUpdate>>,
}

impl SpeechAdapter {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self {
            recognizer: Some(recognizer),
            active: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            counters: Arc::new(Counters::default()),
            task: None,
            updates_rx: None,
        }
    }

    pub async fn initialize(&mut self) -> Result<()> {
        let recognizer = self
            .recognizer
            .as_mut()
            .ok_or_else(|| anyhow!("Speech recognizer is running"))?;
        recognizer.initialize().await?;
        info!("Speech recognizer ready: {}", recognizer.name());
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Begin recognition; the first run must start for the call to succeed
    pub async fn start(&mut self) -> Result<()> {
        let mut recognizer = self
            .recognizer
            .take()
            .ok_or_else(|| anyhow!("Speech recognition already started"))?;

        let first = match recognizer.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.recognizer = Some(recognizer);
                return Err(e);
            }
        };

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        self.updates_rx = Some(updates_rx);
        self.counters = Arc::new(Counters::default());
        self.shutdown = Arc::new(Notify::new());
        self.active.store(true, Ordering::Release);

        let active = self.active.clone();
        let shutdown = self.shutdown.clone();
        let counters = self.counters.clone();

        self.task = Some(tokio::spawn(async move {
            let mut events = first;
            loop {
                let ended = run_until_end(&mut events, &shutdown, &updates_tx, &counters).await;
                if !ended || !active.load(Ordering::Acquire) {
                    break;
                }

                tokio::time::sleep(RESTART_DELAY).await;
                if !active.load(Ordering::Acquire) {
                    break;
                }

                match recognizer.start().await {
                    Ok(rx) => {
                        let n = counters.restarts.fetch_add(1, Ordering::AcqRel) + 1;
                        debug!("Speech recognition restarted ({} restarts)", n);
                        events = rx;
                    }
                    Err(e) => {
                        warn!("Failed to restart speech recognition, giving up: {:#}", e);
                        counters.errors.fetch_add(1, Ordering::AcqRel);
                        break;
                    }
                }
            }

            if let Err(e) = recognizer.stop().await {
                warn!("Failed to stop speech recognizer: {:#}", e);
            }
            recognizer
        }));

        Ok(())
    }

    /// Transcript updates received since the last drain
    pub fn drain_updates(&mut self) -> Vec<TranscriptUpdate> {
        let mut updates = Vec::new();
        if let Some(rx) = self.updates_rx.as_mut() {
            while let Ok(update) = rx.try_recv() {
                updates.push(update);
            }
        }
        updates
    }

    pub async fn stop(&mut self) -> SpeechArtifact {
        self.active.store(false, Ordering::Release);
        self.shutdown.notify_one();

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(recognizer) => self.recognizer = Some(recognizer),
                Err(e) => warn!("Speech recognition task failed: {}", e),
            }
        }

        SpeechArtifact {
            restarts: self.counters.restarts.load(Ordering::Acquire),
            errors: self.counters.errors.load(Ordering::Acquire),
        }
    }
}

/// Forward one run's events; true when the run ended on its own
async fn run_until_end(
    events: &mut mpsc::Receiver<RecognitionEvent>,
    shutdown: &Notify,
    updates: &mpsc::UnboundedSender<TranscriptUpdate>,
    counters: &Counters,
) -> bool {
    loop {
        tokio::select! {
            _ = shutdown.notified() => return false,
            event = events.recv() => match event {
                Some(RecognitionEvent::Result { text, is_final }) => {
                    let update = if is_final {
                        TranscriptUpdate::Final(text)
                    } else {
                        TranscriptUpdate::Interim(text)
                    };
                    let _ = updates.send(update);
                }
                Some(RecognitionEvent::Error(e)) => {
                    counters.errors.fetch_add(1, Ordering::AcqRel);
                    warn!("Speech recognition error: {}", e);
                }
                Some(RecognitionEvent::End) | None => return true,
            }
        }
    }
}

/// Recognizer for hosts without speech-to-text
///
/// Each run stays open and silent until stopped.
#[derive(Default)]
pub struct SilentRecognizer {
    run: Option<mpsc::Sender<RecognitionEvent>>,
}

#[async_trait::async_trait]
impl SpeechRecognizer for SilentRecognizer {
    async fn initialize(&mut self) -> Result<()> {
        warn!("No speech recognizer available, transcript will be empty");
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>> {
        let (tx, rx) = mpsc::channel(1);
        self.run = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.run = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Each run emits one final result and then ends
    struct OneShotRecognizer {
        runs: Arc<Mutex<u32>>,
    }

    #[async_trait::async_trait]
    impl SpeechRecognizer for OneShotRecognizer {
        async fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        async fn start(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>> {
            let run = {
                let mut runs = self.runs.lock().unwrap();
                *runs += 1;
                *runs
            };
            let (tx, rx) = mpsc::channel(4);
            tx.send(RecognitionEvent::Result {
                text: format!("run {}", run),
                is_final: true,
            })
            .await?;
            tx.send(RecognitionEvent::End).await?;
            Ok(rx)
        }

        async fn stop(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "one-shot"
        }
    }

    #[tokio::test]
    async fn test_restarts_on_natural_end_while_active() {
        let runs = Arc::new(Mutex::new(0));
        let mut adapter = SpeechAdapter::new(Box::new(OneShotRecognizer { runs: runs.clone() }));
        adapter.initialize().await.unwrap();
        adapter.start().await.unwrap();

        tokio::time::sleep(RESTART_DELAY * 3).await;
        let artifact = adapter.stop().await;

        assert!(artifact.restarts >= 1);
        assert!(*runs.lock().unwrap() >= 2);

        let updates = adapter.drain_updates();
        assert_eq!(updates[0], TranscriptUpdate::Final("run 1".to_string()));
        assert!(!adapter.is_active());
    }

    #[tokio::test]
    async fn test_stop_returns_recognizer_for_next_session() {
        let runs = Arc::new(Mutex::new(0));
        let mut adapter = SpeechAdapter::new(Box::new(OneShotRecognizer { runs }));
        adapter.start().await.unwrap();
        adapter.stop().await;
        assert!(adapter.start().await.is_ok());
        adapter.stop().await;
    }
}
