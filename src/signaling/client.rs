use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backoff::Backoff;
use super::messages::{signal_subject, DecodeError, SignalKind, SignalMessage};
use crate::config::SignalingConfig;

#[derive(Debug, Clone)]
pub struct SignalingSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl From<&SignalingConfig> for SignalingSettings {
    fn from(config: &SignalingConfig) -> Self {
        Self {
            url: config.url.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalEvent {
    Connected,
    Message(SignalMessage),
    /// The live connection dropped
    Error(String),
    /// A connection attempt failed
    ConnectionError(String),
    /// Reconnect attempts exhausted; the client stays disconnected
    MaxAttemptsReached,
}

struct Connection {
    client: async_nats::Client,
    subject: String,
}

/// Interview signaling over NATS
///
/// One subject per interview. Drops and failed connects are retried on an
/// exponential schedule until the attempt budget runs out.
pub struct SignalingClient {
    settings: SignalingSettings,
    events: broadcast::Sender<SignalEvent>,
    connection: Arc<RwLock<Option<Connection>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SignalingClient {
    pub fn new(settings: SignalingSettings) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            settings,
            events,
            connection: Arc::new(RwLock::new(None)),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.events.subscribe()
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// Join `interview_id`'s channel, replacing any previous one
    pub async fn connect(&self, interview_id: &str) {
        self.disconnect().await;

        let subject = signal_subject(interview_id);
        info!("Joining signaling channel {}", subject);

        let handle = tokio::spawn(run(
            self.settings.clone(),
            subject,
            self.events.clone(),
            Arc::clone(&self.connection),
        ));
        *self.task.lock().await = Some(handle);
    }

    /// Publish a message; dropped with a warning while disconnected
    pub async fn send(&self, kind: SignalKind, data: Value) -> Result<()> {
        let connection = self.connection.read().await;
        let Some(connection) = connection.as_ref() else {
            warn!("Signaling not connected, dropping {} message", kind);
            return Ok(());
        };

        let payload = SignalMessage::new(kind, data).encode()?;
        connection
            .client
            .publish(connection.subject.clone(), payload.into())
            .await
            .context("Failed to publish signaling message")?;

        debug!("Published {} to {}", kind, connection.subject);
        Ok(())
    }

    pub async fn disconnect(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
        if self.connection.write().await.take().is_some() {
            info!("Signaling disconnected");
        }
    }
}

async fn run(
    settings: SignalingSettings,
    subject: String,
    events: broadcast::Sender<SignalEvent>,
    connection: Arc<RwLock<Option<Connection>>>,
) {
    let mut backoff = Backoff::new(settings.base_delay, settings.max_delay, settings.max_attempts);

    loop {
        match open(&settings, &subject).await {
            Ok((client, subscriber)) => {
                backoff.reset();
                *connection.write().await = Some(Connection {
                    client,
                    subject: subject.clone(),
                });
                info!("Signaling connected on {}", subject);
                let _ = events.send(SignalEvent::Connected);

                pump(subscriber, &events).await;

                connection.write().await.take();
                warn!("Signaling subscription on {} closed", subject);
                let _ = events.send(SignalEvent::Error("subscription closed".to_string()));
            }
            Err(e) => {
                warn!("Signaling connection failed: {:#}", e);
                let _ = events.send(SignalEvent::ConnectionError(format!("{:#}", e)));
            }
        }

        match backoff.next_delay() {
            Some(delay) => {
                info!(
                    "Attempting signaling reconnection ({}) in {:?}",
                    backoff.attempt(),
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                error!("Max signaling connection attempts reached");
                let _ = events.send(SignalEvent::MaxAttemptsReached);
                return;
            }
        }
    }
}

async fn open(
    settings: &SignalingSettings,
    subject: &str,
) -> Result<(async_nats::Client, async_nats::Subscriber)> {
    let client = tokio::time::timeout(settings.connect_timeout, async_nats::connect(settings.url.as_str()))
        .await
        .context("Timed out connecting to NATS")?
        .context("Failed to connect to NATS")?;

    let subscriber = client
        .subscribe(subject.to_string())
        .await
        .context("Failed to subscribe to signaling subject")?;

    Ok((client, subscriber))
}

async fn pump(mut subscriber: async_nats::Subscriber, events: &broadcast::Sender<SignalEvent>) {
    while let Some(message) = subscriber.next().await {
        match SignalMessage::decode(&message.payload) {
            Ok(message) => {
                let _ = events.send(SignalEvent::Message(message));
            }
            Err(DecodeError::UnknownType(kind)) => {
                warn!("Unknown signaling message type: {}", kind);
            }
            Err(DecodeError::Malformed(reason)) => {
                warn!("Signaling message parsing error: {}", reason);
            }
        }
    }
}
