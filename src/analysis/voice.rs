// Voice metric calculators
//
// All functions take normalized samples in [-1.0, 1.0] or a dB spectrum
// (one value per frequency bin, like an analyser node) and never panic.
// Degenerate input (empty, non-finite) yields 0.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// FFT size used for spectrum analysis
pub const FFT_SIZE: usize = 2048;

/// Fraction of bins at each edge of the spectrum treated as out-of-band
const OUT_OF_BAND_EDGE: f64 = 0.1;

/// Floor for dB values of silent bins
const MIN_DB: f32 = -160.0;

/// Per-frame voice quality metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFrameMetrics {
    pub volume: f64,
    pub noise_level: f64,
    pub clarity: f64,
    pub steadiness: f64,
}

/// Coarse tone classification from energy bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Calm,
    Neutral,
    Excited,
}

/// Pass/fail view of the current audio quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioQualityStatus {
    pub overall: bool,
    pub volume: bool,
    pub noise: bool,
    pub clarity: bool,
}

/// Live level meter band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeBand {
    TooQuiet,
    Good,
    TooLoud,
}

fn finite(samples: &[f32]) -> impl Iterator<Item = f64> + '_ {
    samples.iter().map(|&s| s as f64).filter(|s| s.is_finite())
}

/// Mean absolute amplitude scaled to 0-100
pub fn calculate_volume(samples: &[f32]) -> f64 {
    let (sum, count) = finite(samples).fold((0.0, 0usize), |(sum, n), s| (sum + s.abs(), n + 1));
    if count == 0 {
        return 0.0;
    }
    sum / count as f64 * 100.0
}

/// Standard deviation of the samples scaled to 0-100
pub fn calculate_noise_level(samples: &[f32]) -> f64 {
    let values: Vec<f64> = finite(samples).collect();
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() * 100.0
}

/// In-band to out-of-band power ratio as a percentage
///
/// The lowest and highest 10% of bins are out-of-band; the denominator is
/// offset by 1.
pub fn calculate_clarity(spectrum_db: &[f32]) -> f64 {
    let bins = spectrum_db.len();
    if bins == 0 {
        return 0.0;
    }

    let low_edge = bins as f64 * OUT_OF_BAND_EDGE;
    let high_edge = bins as f64 * (1.0 - OUT_OF_BAND_EDGE);

    let mut signal_power = 0.0;
    let mut noise_power = 0.0;

    for (i, &db) in spectrum_db.iter().enumerate() {
        if !db.is_finite() {
            continue;
        }
        let power = 10f64.powf(db as f64 / 10.0);
        let idx = i as f64;
        if idx < low_edge || idx > high_edge {
            noise_power += power;
        } else {
            signal_power += power;
        }
    }

    let clarity = signal_power / (noise_power + 1.0) * 100.0;
    if clarity.is_finite() {
        clarity
    } else {
        0.0
    }
}

/// Steadiness of the waveform: 100 minus the scaled total variation
pub fn calculate_steadiness(samples: &[f32]) -> f64 {
    let values: Vec<f64> = finite(samples).collect();
    if values.len() < 2 {
        return 0.0;
    }
    let variation: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    (100.0 - variation * 1000.0).max(0.0)
}

/// Frequency (Hz) of the loudest bin
pub fn estimate_pitch(spectrum_db: &[f32], sample_rate: u32, fft_size: usize) -> f64 {
    if fft_size == 0 {
        return 0.0;
    }
    let bin_hz = sample_rate as f64 / fft_size as f64;
    spectrum_db
        .iter()
        .enumerate()
        .filter(|(_, db)| db.is_finite())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i as f64 * bin_hz)
        .unwrap_or(0.0)
}

/// Classify tone from low (<500Hz), mid (<2kHz) and high energy bands
pub fn classify_tone(spectrum_db: &[f32], sample_rate: u32, fft_size: usize) -> Tone {
    if fft_size == 0 || spectrum_db.is_empty() {
        return Tone::Neutral;
    }
    let bin_hz = sample_rate as f64 / fft_size as f64;
    let (mut low, mut mid, mut high) = (0.0, 0.0, 0.0);

    for (i, &db) in spectrum_db.iter().enumerate() {
        if !db.is_finite() {
            continue;
        }
        let frequency = i as f64 * bin_hz;
        let amplitude = 10f64.powf(db as f64 / 20.0);
        if frequency < 500.0 {
            low += amplitude;
        } else if frequency < 2000.0 {
            mid += amplitude;
        } else {
            high += amplitude;
        }
    }

    if high > mid && high > low {
        Tone::Excited
    } else if low > mid && low > high {
        Tone::Calm
    } else {
        Tone::Neutral
    }
}

/// Compute all per-frame metrics for a sample window
pub fn frame_metrics(samples: &[f32]) -> AudioFrameMetrics {
    let spectrum = power_spectrum_db(samples);
    AudioFrameMetrics {
        volume: calculate_volume(samples),
        noise_level: calculate_noise_level(samples),
        clarity: calculate_clarity(&spectrum),
        steadiness: calculate_steadiness(samples),
    }
}

pub fn audio_quality_status(metrics: &AudioFrameMetrics) -> AudioQualityStatus {
    let volume = metrics.volume > 30.0 && metrics.volume < 90.0;
    let noise = metrics.noise_level < 30.0;
    let clarity = metrics.clarity > 70.0;
    AudioQualityStatus {
        overall: volume && noise && clarity,
        volume,
        noise,
        clarity,
    }
}

pub fn volume_band(volume: f64) -> VolumeBand {
    if volume < 30.0 {
        VolumeBand::TooQuiet
    } else if volume > 80.0 {
        VolumeBand::TooLoud
    } else {
        VolumeBand::Good
    }
}

/// Convert i16 PCM to normalized f32 samples
pub fn normalize_pcm(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| s as f32 / i16::MAX as f32)
        .collect()
}

/// Hann-windowed magnitude spectrum in dB, `fft_size / 2` bins
///
/// Uses the most recent `FFT_SIZE` samples, zero-padded when shorter.
pub fn power_spectrum_db(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let start = samples.len().saturating_sub(FFT_SIZE);
    let window = &samples[start..];
    let n = FFT_SIZE;

    let mut buffer: Vec<Complex<f32>> = (0..n)
        .map(|i| {
            let sample = window.get(i).copied().filter(|s| s.is_finite()).unwrap_or(0.0);
            let hann = 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos();
            Complex::new(sample * hann, 0.0)
        })
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer[..n / 2]
        .iter()
        .map(|c| {
            let magnitude = c.norm() / n as f32;
            if magnitude > 0.0 {
                (20.0 * magnitude.log10()).max(MIN_DB)
            } else {
                MIN_DB
            }
        })
        .collect()
}
