use serde::{Deserialize, Serialize};

use crate::analysis::transcript;
use crate::analysis::voice::AudioFrameMetrics;

/// Session-level voice summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSummary {
    pub samples: u64,
    pub average_volume: f64,
    pub average_noise: f64,
    pub average_clarity: f64,
    pub average_steadiness: f64,
    pub word_count: usize,
    pub words_per_minute: f64,
    /// Weighted voice confidence (0-1)
    pub confidence_score: f64,
}

/// Running voice totals and the accumulated final transcript
#[derive(Debug, Clone, Default)]
pub struct VoiceAggregator {
    samples: u64,
    volume_sum: f64,
    noise_sum: f64,
    clarity_sum: f64,
    steadiness_sum: f64,
    transcript: String,
    last: Option<AudioFrameMetrics>,
}

impl VoiceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metrics: &AudioFrameMetrics) {
        let values = [
            metrics.volume,
            metrics.noise_level,
            metrics.clarity,
            metrics.steadiness,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return;
        }
        self.samples += 1;
        self.volume_sum += metrics.volume;
        self.noise_sum += metrics.noise_level;
        self.clarity_sum += metrics.clarity;
        self.steadiness_sum += metrics.steadiness;
        self.last = Some(*metrics);
    }

    /// Append one final recognition result
    pub fn append_transcript(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(text);
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn last_metrics(&self) -> Option<AudioFrameMetrics> {
        self.last
    }

    fn average(&self, sum: f64) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            sum / self.samples as f64
        }
    }

    pub fn summary(&self, elapsed_secs: f64) -> VoiceSummary {
        let average_volume = self.average(self.volume_sum);
        let average_clarity = self.average(self.clarity_sum);
        let words_per_minute = transcript::speaking_pace(&self.transcript, elapsed_secs);

        VoiceSummary {
            samples: self.samples,
            average_volume,
            average_noise: self.average(self.noise_sum),
            average_clarity,
            average_steadiness: self.average(self.steadiness_sum),
            word_count: transcript::word_count(&self.transcript),
            words_per_minute,
            confidence_score: transcript::voice_confidence(
                &self.transcript,
                average_volume,
                average_clarity,
                words_per_minute,
            ),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let summary = VoiceAggregator::new().summary(0.0);
        assert_eq!(summary, VoiceSummary::default());
    }

    #[test]
    fn test_averages() {
        let mut aggregator = VoiceAggregator::new();
        aggregator.record(&AudioFrameMetrics {
            volume: 40.0,
            noise_level: 10.0,
            clarity: 80.0,
            steadiness: 50.0,
        });
        aggregator.record(&AudioFrameMetrics {
            volume: 60.0,
            noise_level: 20.0,
            clarity: 100.0,
            steadiness: 70.0,
        });
        aggregator.record(&AudioFrameMetrics {
            volume: f64::NAN,
            ..Default::default()
        });

        let summary = aggregator.summary(30.0);
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.average_volume, 50.0);
        assert_eq!(summary.average_noise, 15.0);
        assert_eq!(summary.average_clarity, 90.0);
        assert_eq!(summary.confidence_score, 0.0, "no transcript yet");
    }

    #[test]
    fn test_transcript_accumulates_final_results() {
        let mut aggregator = VoiceAggregator::new();
        aggregator.append_transcript("Hello there.");
        aggregator.append_transcript("   ");
        aggregator.append_transcript(" I build compilers. ");
        assert_eq!(aggregator.transcript(), "Hello there. I build compilers.");

        let summary = aggregator.summary(60.0);
        assert_eq!(summary.word_count, 5);
        assert_eq!(summary.words_per_minute, 5.0);
        assert!(summary.confidence_score > 0.0);

        aggregator.reset();
        assert!(aggregator.transcript().is_empty());
    }
}
