pub mod backend;
pub mod chunk;
pub mod file;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame};
pub use chunk::{RecordedChunk, SessionRecorder};
pub use file::{AudioFile, FileAudioBackend};
