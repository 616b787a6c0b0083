//! Camera and microphone acquisition
//!
//! A `MediaStream` bundles one audio and one video track for the lifetime of
//! a recording. Hosts provide `MediaDevices`; `ReplayDevices` replays a WAV
//! file with no camera for offline runs.

mod stream;
mod video;

pub use stream::{AudioQuality, MediaDevices, MediaStream, RecordingQuality, ReplayDevices, VideoQuality};
pub use video::{NoVideoBackend, VideoBackend, VideoFrame};
