//! Convolution reverb
//!
//! The default impulse response is two seconds of stereo noise under a
//! quadratic decay, `(rand·2 - 1) · (1 - i/len)²`, drawn independently per
//! channel. Pass a seed (or a prepared [`ImpulseResponse`]) for
//! reproducible output; without one the noise comes from entropy.
//!
//! Before convolving, the response is normalized the way Web Audio's
//! `ConvolverNode` does it, so a loud or quiet IR produces a similar wet
//! level:
//!
//! ```text
//! power = sqrt(Σ h² / (channels · len))        floored at 0.000125
//! scale = 0.00125 / power · (44100 / sample_rate)
//! ```
//!
//! Convolution is FFT overlap-add with blocks the size of the response,
//! channel `n` of the input against channel `n` of the response. The output
//! keeps the input length; the tail past the end is dropped.

use crate::error::MixingError;
use crate::signal::{resample_linear, StereoBuffer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub const DEFAULT_LENGTH_SECS: f64 = 2.0;

const GAIN_CALIBRATION: f64 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f64 = 44100.0;
const MIN_POWER: f64 = 0.000125;

/// A stereo impulse response
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: u32,
}

impl ImpulseResponse {
    /// Use existing samples. A single channel is used for both sides.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, MixingError> {
        if sample_rate == 0 {
            return Err(MixingError::InvalidImpulse("sample rate is zero".to_string()));
        }

        let mut iter = channels.into_iter();
        let (left, right) = match (iter.next(), iter.next(), iter.next()) {
            (Some(mono), None, None) => (mono.clone(), mono),
            (Some(left), Some(right), None) => (left, right),
            (None, _, _) => return Err(MixingError::InvalidImpulse("no channels".to_string())),
            _ => {
                return Err(MixingError::InvalidImpulse(
                    "more than two channels".to_string(),
                ))
            }
        };

        if left.is_empty() || left.len() != right.len() {
            return Err(MixingError::InvalidImpulse(format!(
                "channel lengths {} and {}",
                left.len(),
                right.len()
            )));
        }
        if left.iter().chain(right.iter()).any(|s| !s.is_finite()) {
            return Err(MixingError::InvalidImpulse("non-finite sample".to_string()));
        }

        Ok(Self {
            left,
            right,
            sample_rate,
        })
    }

    /// Decaying stereo noise, `length_secs` long
    pub fn noise<R: Rng>(rng: &mut R, sample_rate: u32, length_secs: f64) -> Self {
        let len = ((sample_rate as f64 * length_secs) as usize).max(1);
        let mut channel = || -> Vec<f32> {
            (0..len)
                .map(|i| {
                    let decay = (1.0 - i as f64 / len as f64).powi(2);
                    ((rng.gen::<f64>() * 2.0 - 1.0) * decay) as f32
                })
                .collect()
        };
        let left = channel();
        let right = channel();
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// The default two-second response, seeded or from entropy
    pub fn generate(sample_rate: u32, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::noise(&mut rng, sample_rate, DEFAULT_LENGTH_SECS)
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Normalization factor applied to the response before convolving
    pub fn normalization_scale(&self) -> f64 {
        let sum_sq: f64 = self
            .left
            .iter()
            .chain(self.right.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();
        let power = (sum_sq / (2 * self.len()) as f64).sqrt().max(MIN_POWER);
        GAIN_CALIBRATION / power * (GAIN_CALIBRATION_SAMPLE_RATE / self.sample_rate as f64)
    }

    /// Same response at another rate
    pub fn resampled(&self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate {
            return self.clone();
        }
        Self {
            left: resample_linear(&self.left, self.sample_rate, sample_rate),
            right: resample_linear(&self.right, self.sample_rate, sample_rate),
            sample_rate,
        }
    }
}

/// One channel's worth of precomputed IR spectrum
struct KernelSpectrum(Vec<Complex<f64>>);

/// Overlap-add FFT convolver for a stereo response
pub struct Convolver {
    block: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    kernels: [KernelSpectrum; 2],
    sample_rate: u32,
}

impl std::fmt::Debug for Convolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Convolver")
            .field("block", &self.block)
            .field("fft_size", &self.fft_size)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl Convolver {
    /// Prepare `ir` for rendering at `sample_rate`, normalizing it first
    pub fn new(ir: &ImpulseResponse, sample_rate: u32) -> Result<Self, MixingError> {
        if sample_rate == 0 {
            return Err(MixingError::InvalidSampleRate(sample_rate));
        }
        let ir = ir.resampled(sample_rate);
        if ir.is_empty() {
            return Err(MixingError::InvalidImpulse("empty after resampling".to_string()));
        }

        let scale = ir.normalization_scale();
        if !scale.is_finite() {
            return Err(MixingError::InvalidImpulse(format!("normalization scale {}", scale)));
        }

        let block = ir.len();
        let fft_size = (2 * block).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let kernel = |samples: &[f32]| -> KernelSpectrum {
            let mut buf = vec![Complex::new(0.0, 0.0); fft_size];
            for (slot, &s) in buf.iter_mut().zip(samples) {
                *slot = Complex::new(s as f64 * scale, 0.0);
            }
            forward.process(&mut buf);
            KernelSpectrum(buf)
        };
        let kernels = [kernel(ir.left()), kernel(ir.right())];

        log::debug!(
            "Convolver ready: {} sample IR, fft size {}, scale {:.6}",
            block,
            fft_size,
            scale
        );

        Ok(Self {
            block,
            fft_size,
            forward,
            inverse,
            kernels,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Convolve one channel, output truncated to the input length
    fn convolve_channel(&self, input: &[f32], kernel: &KernelSpectrum) -> Vec<f32> {
        let mut output = vec![0.0f64; input.len()];
        let mut buf = vec![Complex::new(0.0, 0.0); self.fft_size];
        let norm = 1.0 / self.fft_size as f64;

        for (block_index, chunk) in input.chunks(self.block).enumerate() {
            // Silent blocks contribute nothing
            if chunk.iter().all(|&s| s == 0.0) {
                continue;
            }

            buf.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
            for (slot, &s) in buf.iter_mut().zip(chunk) {
                *slot = Complex::new(s as f64, 0.0);
            }

            self.forward.process(&mut buf);
            for (x, h) in buf.iter_mut().zip(kernel.0.iter()) {
                *x = *x * *h;
            }
            self.inverse.process(&mut buf);

            let offset = block_index * self.block;
            for (out, y) in output[offset..].iter_mut().zip(buf.iter()) {
                *out += y.re * norm;
            }
        }

        output.into_iter().map(|s| s as f32).collect()
    }

    /// The wet signal for `input`
    pub fn convolve(&self, input: &StereoBuffer) -> StereoBuffer {
        let (left, right) = rayon::join(
            || self.convolve_channel(&input.left, &self.kernels[0]),
            || self.convolve_channel(&input.right, &self.kernels[1]),
        );
        StereoBuffer {
            left,
            right,
            sample_rate: input.sample_rate,
        }
    }

    /// Parallel send: `buffer += amount · wet(buffer)`
    pub fn process_send(&self, buffer: &mut StereoBuffer, amount: f64) {
        if amount == 0.0 {
            return;
        }
        let wet = self.convolve(buffer);
        let amount = amount as f32;
        for (dry, w) in buffer.left.iter_mut().zip(wet.left.iter()) {
            *dry += amount * w;
        }
        for (dry, w) in buffer.right.iter_mut().zip(wet.right.iter()) {
            *dry += amount * w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct-form convolution for comparison
    fn naive_convolve(input: &[f32], kernel: &[f32], scale: f64) -> Vec<f32> {
        (0..input.len())
            .map(|n| {
                let mut acc = 0.0f64;
                for (k, &h) in kernel.iter().enumerate() {
                    if k > n {
                        break;
                    }
                    acc += input[n - k] as f64 * h as f64 * scale;
                }
                acc as f32
            })
            .collect()
    }

    // ==========================================================================
    // IMPULSE RESPONSE
    // ==========================================================================

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = ImpulseResponse::generate(8000, Some(42));
        let b = ImpulseResponse::generate(8000, Some(42));
        let c = ImpulseResponse::generate(8000, Some(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16000);
    }

    #[test]
    fn test_noise_decays() {
        let ir = ImpulseResponse::generate(8000, Some(1));
        assert!(ir.left().iter().all(|s| s.abs() <= 1.0));
        let head: f64 = ir.left()[..1000].iter().map(|&s| (s as f64).powi(2)).sum();
        let tail: f64 = ir.left()[15000..].iter().map(|&s| (s as f64).powi(2)).sum();
        assert!(head > tail * 100.0);
        assert_ne!(ir.left(), ir.right(), "channels should be independent noise");
    }

    #[test]
    fn test_from_channels_validation() {
        assert!(ImpulseResponse::from_channels(vec![], 44100).is_err());
        assert!(ImpulseResponse::from_channels(vec![vec![1.0]], 0).is_err());
        assert!(ImpulseResponse::from_channels(vec![vec![1.0], vec![1.0, 0.0]], 44100).is_err());
        assert!(ImpulseResponse::from_channels(vec![vec![f32::NAN]], 44100).is_err());

        let mono = ImpulseResponse::from_channels(vec![vec![1.0, 0.5]], 44100).unwrap();
        assert_eq!(mono.left(), mono.right());
    }

    // ==========================================================================
    // NORMALIZATION
    // ==========================================================================
    //
    // A unit impulse has power sqrt(2 / (2·1)) = 1 → scale 0.00125 at 44.1kHz.
    // ==========================================================================

    #[test]
    fn test_normalization_scale() {
        let ir = ImpulseResponse::from_channels(vec![vec![1.0], vec![1.0]], 44100).unwrap();
        assert!((ir.normalization_scale() - 0.00125).abs() < 1e-12);

        let half_rate = ImpulseResponse::from_channels(vec![vec![1.0], vec![1.0]], 22050).unwrap();
        assert!((half_rate.normalization_scale() - 0.0025).abs() < 1e-12);

        // Silent response: power floored, so no division by zero
        let silent = ImpulseResponse::from_channels(vec![vec![0.0; 8]], 44100).unwrap();
        assert!((silent.normalization_scale() - 10.0).abs() < 1e-9);
    }

    // ==========================================================================
    // CONVOLUTION
    // ==========================================================================

    #[test]
    fn test_matches_direct_convolution() {
        let ir = ImpulseResponse::from_channels(
            vec![vec![1.0, 0.5, -0.25, 0.125], vec![0.0, 1.0, 0.0, 0.0]],
            44100,
        )
        .unwrap();
        let scale = ir.normalization_scale();
        let conv = Convolver::new(&ir, 44100).unwrap();

        let input: Vec<f32> = (0..37).map(|i| ((i * 7) % 11) as f32 / 11.0 - 0.5).collect();
        let buffer = StereoBuffer {
            left: input.clone(),
            right: input.clone(),
            sample_rate: 44100,
        };
        let wet = conv.convolve(&buffer);

        let expected_left = naive_convolve(&input, ir.left(), scale);
        let expected_right = naive_convolve(&input, ir.right(), scale);
        assert_eq!(wet.left.len(), input.len());
        for i in 0..input.len() {
            assert!((wet.left[i] - expected_left[i]).abs() < 1e-5, "left[{}]", i);
            assert!((wet.right[i] - expected_right[i]).abs() < 1e-5, "right[{}]", i);
        }
    }

    #[test]
    fn test_silence_in_silence_out() {
        let conv = Convolver::new(&ImpulseResponse::generate(8000, Some(7)), 8000).unwrap();
        let mut buffer = StereoBuffer::silent(20000, 8000);
        conv.process_send(&mut buffer, 0.2);
        assert!(buffer.left.iter().chain(buffer.right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_amount_is_dry() {
        let conv = Convolver::new(&ImpulseResponse::generate(8000, Some(7)), 8000).unwrap();
        let mut buffer = StereoBuffer {
            left: vec![0.5; 100],
            right: vec![0.5; 100],
            sample_rate: 8000,
        };
        conv.process_send(&mut buffer, 0.0);
        assert!(buffer.left.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_response_at_other_rate_is_resampled() {
        let ir = ImpulseResponse::generate(8000, Some(3));
        let conv = Convolver::new(&ir, 16000).unwrap();
        assert_eq!(conv.sample_rate(), 16000);
    }
}
