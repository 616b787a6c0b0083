use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One RGBA camera frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
    pub data: Arc<[u8]>,
}

/// Camera capture backend, mirroring `AudioBackend`
#[async_trait::async_trait]
pub trait VideoBackend: Send + Sync {
    async fn start(&mut self) -> Result<mpsc::Receiver<VideoFrame>>;

    async fn stop(&mut self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    fn name(&self) -> &str;
}

/// Camera track that never yields a frame
#[derive(Default)]
pub struct NoVideoBackend {
    sender: Option<mpsc::Sender<VideoFrame>>,
}

#[async_trait::async_trait]
impl VideoBackend for NoVideoBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<VideoFrame>> {
        let (tx, rx) = mpsc::channel(1);
        // Held so the receiver stays open until stop
        self.sender = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.sender = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.sender.is_some()
    }

    fn name(&self) -> &str {
        "none"
    }
}
