//! Byte snapshots of a playing signal
//!
//! The analyzer consumes the same data a browser `AnalyserNode` hands out:
//! one row of 0-255 spectrum magnitudes and one row of 0-255 waveform
//! samples. [`SnapshotAnalyser`] produces both from decoded audio so files
//! can be analyzed offline.
//!
//! # Spectrum pipeline
//!
//! ```text
//! last fft_size samples
//!   → Blackman window (a0=0.42, a1=0.5, a2=0.08)
//!   → forward FFT, |X[k]| / N
//!   → smoothing: S[k] = τ·S_prev[k] + (1-τ)·|X[k]|      τ = 0.8
//!   → dB = 20·log10(S[k])
//!   → byte = 255 · (dB - min_db) / (max_db - min_db)     clamped to 0..255
//! ```
//!
//! With the defaults (-100 dB .. -30 dB) a full-scale sine saturates its bin
//! at 255 and anything below -100 dB reads 0.
//!
//! The waveform row is `frequency_bin_count` bytes long, the oldest half of
//! the analysis window, as `getByteTimeDomainData` fills an array of that
//! size.
//!
//! Smoothing makes the output depend on previous calls. [`SnapshotAnalyser::capture`]
//! warms the smoother up over the frames leading to the requested time the
//! way a display refreshing at 60 Hz would, so each capture is
//! self-contained and independent captures can run in parallel.

use crate::signal::AudioSignal;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_SMOOTHING: f64 = 0.8;
pub const DEFAULT_MIN_DB: f64 = -100.0;
pub const DEFAULT_MAX_DB: f64 = -30.0;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Display refreshes per second when warming up the smoother
const REFRESH_RATE: f64 = 60.0;
/// 0.8^24 < 0.5%, enough for the smoother to settle
const WARMUP_FRAMES: usize = 24;

/// Blackman window as used by Web Audio (denominator N, not N-1)
fn blackman_window(size: usize) -> Vec<f64> {
    let n = size as f64;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f64::consts::PI * i as f64 / n;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}

/// Convert linear magnitude to dB
fn to_db(value: f64) -> f64 {
    if value <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * value.log10()
    }
}

/// One spectrum row and one waveform row taken at the same instant
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Position in the source, seconds
    pub time_secs: f64,
    pub sample_rate: f64,
    #[serde(skip)]
    pub frequency: Vec<u8>,
    #[serde(skip)]
    pub waveform: Vec<u8>,
}

pub struct SnapshotAnalyser {
    fft_size: usize,
    smoothing: f64,
    min_db: f64,
    max_db: f64,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
    smoothed: Vec<f64>,
}

impl std::fmt::Debug for SnapshotAnalyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotAnalyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_db", &self.min_db)
            .field("max_db", &self.max_db)
            .finish()
    }
}

impl Default for SnapshotAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotAnalyser {
    pub fn new() -> Self {
        Self::with_fft_size(DEFAULT_FFT_SIZE)
    }

    /// `fft_size` is rounded up to a power of two in 32..=32768
    pub fn with_fft_size(fft_size: usize) -> Self {
        let fft_size = fft_size
            .clamp(MIN_FFT_SIZE, MAX_FFT_SIZE)
            .next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        Self {
            fft_size,
            smoothing: DEFAULT_SMOOTHING,
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
            window: blackman_window(fft_size),
            fft,
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    /// Smoothing constant τ, clamped to 0..=1
    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = if smoothing.is_finite() {
            smoothing.clamp(0.0, 1.0)
        } else {
            DEFAULT_SMOOTHING
        };
        self
    }

    /// Decibel range mapped onto 0..255. Ignored unless `min_db < max_db`.
    pub fn with_db_range(mut self, min_db: f64, max_db: f64) -> Self {
        if min_db < max_db {
            self.min_db = min_db;
            self.max_db = max_db;
        }
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Forget smoothing history
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }

    /// The most recent `fft_size` samples, zero-padded at the front
    fn frame<'a>(&self, samples: &'a [f32]) -> (usize, &'a [f32]) {
        let take = samples.len().min(self.fft_size);
        (self.fft_size - take, &samples[samples.len() - take..])
    }

    /// Spectrum bytes for the block ending at the last sample, updating
    /// the smoothing state
    pub fn byte_frequency_data(&mut self, samples: &[f32]) -> Vec<u8> {
        let (pad, recent) = self.frame(samples);

        let mut buffer = vec![Complex::new(0.0, 0.0); self.fft_size];
        for (i, &s) in recent.iter().enumerate() {
            let idx = pad + i;
            buffer[idx] = Complex::new(s as f64 * self.window[idx], 0.0);
        }
        self.fft.process(&mut buffer);

        let scale = 1.0 / self.fft_size as f64;
        let tau = self.smoothing;
        let range = self.max_db - self.min_db;

        self.smoothed
            .iter_mut()
            .zip(buffer.iter())
            .map(|(prev, bin)| {
                let magnitude = bin.norm() * scale;
                let value = tau * *prev + (1.0 - tau) * magnitude;
                // Keep the smoother from carrying NaN/inf forward
                *prev = if value.is_finite() { value } else { 0.0 };

                let db = to_db(*prev);
                let scaled = 255.0 * (db - self.min_db) / range;
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// Waveform bytes for the block ending at the last sample.
    ///
    /// `128 + 128·sample`, truncated and clamped; missing history reads 128.
    pub fn byte_time_domain_data(&self, samples: &[f32]) -> Vec<u8> {
        let (pad, recent) = self.frame(samples);
        let mut out = vec![128u8; pad];
        out.extend(recent.iter().map(|&s| {
            let scaled = 128.0 * (s as f64 + 1.0);
            if scaled.is_nan() {
                128
            } else {
                scaled.clamp(0.0, 255.0) as u8
            }
        }));
        out
    }

    /// Snapshot of `signal` at `time_secs`, as a display refreshing at
    /// 60 Hz would have seen it. Smoothing history is reset first.
    pub fn capture(&mut self, signal: &AudioSignal, time_secs: f64) -> Snapshot {
        let mono = signal.mono();
        let sample_rate = signal.sample_rate() as f64;

        let position = if time_secs.is_finite() && time_secs > 0.0 {
            ((time_secs * sample_rate) as usize).min(mono.len())
        } else {
            0
        };
        let hop = ((sample_rate / REFRESH_RATE) as usize).max(1);

        self.reset();
        let mut frequency = Vec::new();
        for k in (0..WARMUP_FRAMES).rev() {
            let end = position.saturating_sub(k * hop);
            frequency = self.byte_frequency_data(&mono[..end]);
        }
        let mut waveform = self.byte_time_domain_data(&mono[..position]);
        waveform.truncate(self.frequency_bin_count());

        Snapshot {
            time_secs,
            sample_rate,
            frequency,
            waveform,
        }
    }

    /// Capture times every `interval_secs` across the signal, starting one
    /// interval in so the first snapshot has history
    pub fn timeline(signal: &AudioSignal, interval_secs: f64) -> Vec<f64> {
        let duration = signal.duration_secs();
        if !(interval_secs.is_finite() && interval_secs > 0.0) || duration <= 0.0 {
            return Vec::new();
        }
        let count = (duration / interval_secs).floor() as usize;
        (1..=count).map(|i| i as f64 * interval_secs).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                amplitude
                    * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin()
                        as f32
            })
            .collect()
    }

    fn argmax(data: &[u8]) -> usize {
        data.iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap()
    }

    // ==========================================================================
    // SHAPE
    // ==========================================================================

    #[test]
    fn test_default_sizes() {
        let a = SnapshotAnalyser::new();
        assert_eq!(a.fft_size(), 2048);
        assert_eq!(a.frequency_bin_count(), 1024);
    }

    #[test]
    fn test_fft_size_rounded_to_power_of_two() {
        assert_eq!(SnapshotAnalyser::with_fft_size(1000).fft_size(), 1024);
        assert_eq!(SnapshotAnalyser::with_fft_size(1).fft_size(), 32);
        assert_eq!(SnapshotAnalyser::with_fft_size(1 << 20).fft_size(), 32768);
    }

    #[test]
    fn test_window_is_blackman() {
        let w = blackman_window(2048);
        assert!(w[0].abs() < 1e-9);
        assert!((w[1024] - 1.0).abs() < 1e-9);
    }

    // ==========================================================================
    // SPECTRUM BYTES
    // ==========================================================================
    //
    // At 44.1kHz with 2048-point FFT each bin is ~21.5 Hz wide, so a 1 kHz
    // tone lands around bin 46.
    // ==========================================================================

    #[test]
    fn test_silence_reads_zero() {
        let mut a = SnapshotAnalyser::new();
        let data = a.byte_frequency_data(&vec![0.0; 4096]);
        assert_eq!(data.len(), 1024);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        let mut a = SnapshotAnalyser::new();
        let tone = sine(1000.0, 0.5, 44100, 8192);
        let mut data = Vec::new();
        for _ in 0..30 {
            data = a.byte_frequency_data(&tone);
        }
        let peak = argmax(&data);
        assert!((45..=48).contains(&peak), "peak at bin {}", peak);
        assert_eq!(data[peak], 255, "loud tone should saturate");
        assert!(data[600] < 50, "far bins should be quiet: {}", data[600]);
    }

    #[test]
    fn test_smoothing_ramps_up() {
        let mut a = SnapshotAnalyser::new();
        let tone = sine(1000.0, 0.001, 44100, 4096);
        let first = a.byte_frequency_data(&tone)[46];
        let mut later = first;
        for _ in 0..30 {
            later = a.byte_frequency_data(&tone)[46];
        }
        assert!(later > first, "smoothing should converge upward: {} -> {}", first, later);
    }

    #[test]
    fn test_no_smoothing_is_immediate() {
        let tone = sine(1000.0, 0.001, 44100, 4096);
        let mut a = SnapshotAnalyser::new().with_smoothing(0.0);
        let first = a.byte_frequency_data(&tone);
        let second = a.byte_frequency_data(&tone);
        assert_eq!(first, second);
    }

    // ==========================================================================
    // WAVEFORM BYTES
    // ==========================================================================

    #[test]
    fn test_time_domain_mapping() {
        let a = SnapshotAnalyser::with_fft_size(32);
        let mut samples = vec![0.0f32; 29];
        samples.extend([1.0, -1.0, 0.5]);
        let data = a.byte_time_domain_data(&samples);
        assert_eq!(data.len(), 32);
        assert_eq!(data[0], 128);
        assert_eq!(data[29], 255);
        assert_eq!(data[30], 0);
        assert_eq!(data[31], 192);
    }

    #[test]
    fn test_short_input_is_padded_with_center() {
        let a = SnapshotAnalyser::with_fft_size(32);
        let data = a.byte_time_domain_data(&[1.0]);
        assert_eq!(data.len(), 32);
        assert!(data[..31].iter().all(|&b| b == 128));
        assert_eq!(data[31], 255);
    }

    // ==========================================================================
    // CAPTURE
    // ==========================================================================

    #[test]
    fn test_capture_is_repeatable() {
        let signal = AudioSignal::from_channels(vec![sine(440.0, 0.3, 44100, 44100)], 44100).unwrap();
        let mut a = SnapshotAnalyser::new();
        let first = a.capture(&signal, 0.5);
        let second = a.capture(&signal, 0.5);
        assert_eq!(first.frequency, second.frequency);
        assert_eq!(first.waveform, second.waveform);
        assert_eq!(first.sample_rate, 44100.0);
    }

    #[test]
    fn test_capture_waveform_is_oldest_half_of_window() {
        // 1s of silence, then a full-scale tone
        let mut samples = vec![0.0f32; 44100];
        samples.extend(sine(440.0, 1.0, 44100, 44100));
        let signal = AudioSignal::from_channels(vec![samples], 44100).unwrap();

        // Window ends 1024 samples into the tone: its older half is silent
        let snapshot = SnapshotAnalyser::new().capture(&signal, (44100.0 + 1024.0) / 44100.0);
        assert_eq!(snapshot.waveform.len(), 1024);
        assert!(snapshot.waveform.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_timeline() {
        let signal = AudioSignal::constant(0.0, 1, 44100 * 10, 44100);
        assert_eq!(SnapshotAnalyser::timeline(&signal, 3.0), vec![3.0, 6.0, 9.0]);
        assert!(SnapshotAnalyser::timeline(&signal, 0.0).is_empty());
    }
}
