use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backend::AudioFrame;

/// A finished WAV segment of the candidate's microphone
///
/// Offsets are relative to the first frame the session recorded, so the
/// report can point a reviewer at the audio behind a transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedChunk {
    pub index: usize,
    pub path: PathBuf,
    pub offset_ms: u64,
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
}

impl RecordedChunk {
    /// True if `offset_ms` (session time) falls inside this chunk
    pub fn covers(&self, offset_ms: u64) -> bool {
        offset_ms >= self.offset_ms && offset_ms < self.offset_ms + self.duration_ms
    }
}

/// Writes one session's microphone track as `<session>-audio-NNN.wav`
///
/// Frames are written as they arrive. A chunk is closed once it holds
/// `chunk_duration` of audio, or when the track's format changes.
pub struct SessionRecorder {
    session_id: String,
    output_dir: PathBuf,
    chunk_duration_ms: u64,
    /// Session time of the next sample
    position_ms: u64,
    open: Option<OpenChunk>,
    finished: Vec<RecordedChunk>,
}

struct OpenChunk {
    writer: hound::WavWriter<BufWriter<File>>,
    chunk: RecordedChunk,
}

impl SessionRecorder {
    pub fn create(session_id: &str, output_dir: impl Into<PathBuf>, chunk_duration: Duration) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create recordings directory {:?}", output_dir))?;

        Ok(Self {
            session_id: session_id.to_string(),
            output_dir,
            chunk_duration_ms: (chunk_duration.as_millis() as u64).max(1),
            position_ms: 0,
            open: None,
            finished: Vec::new(),
        })
    }

    /// Chunks closed so far
    pub fn chunks(&self) -> &[RecordedChunk] {
        &self.finished
    }

    pub fn write(&mut self, frame: &AudioFrame) -> Result<()> {
        if frame.samples.is_empty() {
            return Ok(());
        }

        let roll = match &self.open {
            None => false,
            Some(open) => {
                open.chunk.duration_ms >= self.chunk_duration_ms
                    || open.chunk.sample_rate != frame.sample_rate
                    || open.chunk.channels != frame.channels
            }
        };
        if roll {
            self.close()?;
        }
        if self.open.is_none() {
            self.open = Some(self.open_chunk(frame)?);
        }

        if let Some(open) = &mut self.open {
            for &sample in &frame.samples {
                open.writer
                    .write_sample(sample)
                    .context("Failed to write microphone sample")?;
            }
            open.chunk.sample_count += frame.samples.len();
            open.chunk.duration_ms = samples_to_ms(
                open.chunk.sample_count,
                open.chunk.sample_rate,
                open.chunk.channels,
            );
        }
        self.position_ms += frame.duration_ms();
        Ok(())
    }

    /// Close the open chunk and return everything recorded
    pub fn finish(mut self) -> Result<Vec<RecordedChunk>> {
        self.close()?;
        info!(
            "Recorded {} audio chunk(s) for session {}",
            self.finished.len(),
            self.session_id
        );
        Ok(std::mem::take(&mut self.finished))
    }

    fn open_chunk(&self, frame: &AudioFrame) -> Result<OpenChunk> {
        let index = self.finished.len();
        let path = self
            .output_dir
            .join(format!("{}-audio-{:03}.wav", self.session_id, index));
        let writer = hound::WavWriter::create(
            &path,
            hound::WavSpec {
                channels: frame.channels,
                sample_rate: frame.sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
        )
        .with_context(|| format!("Failed to create {:?}", path))?;

        debug!("Opened audio chunk {} at {}ms", index, self.position_ms);
        Ok(OpenChunk {
            writer,
            chunk: RecordedChunk {
                index,
                path,
                offset_ms: self.position_ms,
                duration_ms: 0,
                sample_rate: frame.sample_rate,
                channels: frame.channels,
                sample_count: 0,
            },
        })
    }

    fn close(&mut self) -> Result<()> {
        if let Some(open) = self.open.take() {
            open.writer
                .finalize()
                .with_context(|| format!("Failed to finalize {:?}", open.chunk.path))?;
            self.finished.push(open.chunk);
        }
        Ok(())
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Dropping recorder for session {}: {:#}", self.session_id, e);
        }
    }
}

fn samples_to_ms(samples: usize, sample_rate: u32, channels: u16) -> u64 {
    if sample_rate == 0 || channels == 0 {
        return 0;
    }
    (samples as u64 / channels as u64) * 1000 / sample_rate as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(len: usize, sample_rate: u32, channels: u16) -> AudioFrame {
        AudioFrame {
            samples: vec![1; len],
            sample_rate,
            channels,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_format_change_starts_new_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::create("s", dir.path(), Duration::from_secs(60)).unwrap();

        recorder.write(&frame(1600, 16000, 1)).unwrap();
        recorder.write(&frame(4800, 48000, 1)).unwrap();
        let chunks = recorder.finish().unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].duration_ms, 100);
        assert_eq!(chunks[1].offset_ms, 100);
        assert_eq!(chunks[1].sample_rate, 48000);
    }

    #[test]
    fn test_covers_uses_session_offsets() {
        let chunk = RecordedChunk {
            index: 1,
            path: PathBuf::from("x.wav"),
            offset_ms: 2000,
            duration_ms: 2000,
            sample_rate: 16000,
            channels: 1,
            sample_count: 32000,
        };
        assert!(chunk.covers(2000));
        assert!(chunk.covers(3999));
        assert!(!chunk.covers(4000));
        assert!(!chunk.covers(1999));
    }

    #[test]
    fn test_empty_frames_open_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = SessionRecorder::create("s", dir.path(), Duration::from_secs(1)).unwrap();
        recorder.write(&frame(0, 16000, 1)).unwrap();
        assert!(recorder.chunks().is_empty());
        assert!(recorder.finish().unwrap().is_empty());
        assert!(!dir.path().join("s-audio-000.wav").exists());
    }
}
