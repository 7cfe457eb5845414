//! Feed-forward dynamics: compressor, limiter and de-esser
//!
//! # Compressor
//!
//! Stereo-linked peak detection feeds a soft-knee gain computer. With
//! threshold T, ratio R and knee width W (all in dB), input level x maps to
//!
//! ```text
//! 2(x - T) < -W      y = x
//! |2(x - T)| <= W    y = x + (1/R - 1)(x - T + W/2)² / 2W
//! 2(x - T) > W       y = T + (x - T) / R
//! ```
//!
//! The gain reduction `x - y` is smoothed with separate attack and release
//! time constants (`coeff = exp(-1 / (τ·fs))`) and applied to both
//! channels. A limiter is the same machine with a high ratio and a short
//! release.
//!
//! Make-up gain is automatic, as in a Web Audio `DynamicsCompressorNode`:
//! the curve's output for a 0 dB input is lifted by 60% of its reduction.
//!
//! ```text
//! makeup_db = 0.6 · (0 - y(0))
//! ```
//!
//! # De-esser
//!
//! A fixed -6 dB peaking cut at 7 kHz, Q 2, applied to everything that
//! passes through. It does not listen for sibilance first.

use super::biquad::{Biquad, BiquadCoeffs};
use super::time_coefficient;
use crate::signal::StereoBuffer;
use serde::Serialize;

/// Level reported for digital silence
const SILENCE_DB: f64 = -200.0;

/// Share of the full-scale reduction given back as make-up gain
const MAKEUP_EXPONENT: f64 = 0.6;

fn linear_to_db(value: f64) -> f64 {
    if value <= 0.0 {
        SILENCE_DB
    } else {
        (20.0 * value.log10()).max(SILENCE_DB)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressorSettings {
    pub threshold_db: f64,
    pub knee_db: f64,
    pub ratio: f64,
    pub attack_secs: f64,
    pub release_secs: f64,
}

impl CompressorSettings {
    pub const fn new(threshold_db: f64, knee_db: f64, ratio: f64, attack_secs: f64, release_secs: f64) -> Self {
        Self {
            threshold_db,
            knee_db,
            ratio,
            attack_secs,
            release_secs,
        }
    }

    /// Check every parameter against its usable range.
    ///
    /// | Parameter | Range |
    /// |-----------|-------|
    /// | threshold | -100 ..= 0 dB |
    /// | knee | 0 ..= 40 dB |
    /// | ratio | 1 ..= 20 |
    /// | attack, release | 0 ..= 1 s |
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("threshold", self.threshold_db, -100.0, 0.0),
            ("knee", self.knee_db, 0.0, 40.0),
            ("ratio", self.ratio, 1.0, 20.0),
            ("attack", self.attack_secs, 0.0, 1.0),
            ("release", self.release_secs, 0.0, 1.0),
        ];
        for (name, value, min, max) in checks {
            if !value.is_finite() || value < min || value > max {
                return Err(format!("{} {} outside {}..={}", name, value, min, max));
            }
        }
        Ok(())
    }

    /// Static curve: output level in dB for a steady input level in dB
    pub fn output_level_db(&self, input_db: f64) -> f64 {
        let over = input_db - self.threshold_db;
        let slope = 1.0 / self.ratio - 1.0;
        let w = self.knee_db;

        if 2.0 * over < -w {
            input_db
        } else if w > 0.0 && 2.0 * over.abs() <= w {
            input_db + slope * (over + w / 2.0).powi(2) / (2.0 * w)
        } else {
            self.threshold_db + over / self.ratio
        }
    }

    /// Static gain reduction in dB (always >= 0)
    pub fn reduction_db(&self, input_db: f64) -> f64 {
        (input_db - self.output_level_db(input_db)).max(0.0)
    }

    /// Automatic make-up gain in dB, applied after the gain reduction
    pub fn makeup_gain_db(&self) -> f64 {
        MAKEUP_EXPONENT * self.reduction_db(0.0)
    }
}

/// Feed-forward stereo-linked compressor
#[derive(Debug, Clone)]
pub struct Compressor {
    settings: CompressorSettings,
    attack_coeff: f64,
    release_coeff: f64,
    makeup_db: f64,
    /// Smoothed gain reduction in dB
    envelope_db: f64,
}

impl Compressor {
    pub fn new(settings: CompressorSettings, sample_rate: u32) -> Self {
        let fs = sample_rate as f64;
        Self {
            settings,
            attack_coeff: time_coefficient(settings.attack_secs, fs),
            release_coeff: time_coefficient(settings.release_secs, fs),
            makeup_db: settings.makeup_gain_db(),
            envelope_db: 0.0,
        }
    }

    pub fn settings(&self) -> &CompressorSettings {
        &self.settings
    }

    /// Current smoothed gain reduction in dB
    pub fn gain_reduction_db(&self) -> f64 {
        self.envelope_db
    }

    /// Gain to apply for one frame given its stereo peak
    #[inline]
    fn frame_gain(&mut self, peak: f64) -> f64 {
        let target = self.settings.reduction_db(linear_to_db(peak));
        let coeff = if target > self.envelope_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope_db = coeff * self.envelope_db + (1.0 - coeff) * target;
        10f64.powf((self.makeup_db - self.envelope_db) / 20.0)
    }

    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        for (l, r) in buffer.left.iter_mut().zip(buffer.right.iter_mut()) {
            let peak = (*l as f64).abs().max((*r as f64).abs());
            let gain = self.frame_gain(peak);
            *l = (*l as f64 * gain) as f32;
            *r = (*r as f64 * gain) as f32;
        }
    }

    pub fn reset(&mut self) {
        self.envelope_db = 0.0;
    }
}

/// Settings for the [`DeEsser`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeEsserSettings {
    pub frequency: f64,
    pub q: f64,
    pub reduction_db: f64,
}

impl Default for DeEsserSettings {
    fn default() -> Self {
        Self {
            frequency: 7000.0,
            q: 2.0,
            reduction_db: -6.0,
        }
    }
}

/// Static sibilance cut
#[derive(Debug, Clone)]
pub struct DeEsser {
    settings: DeEsserSettings,
    cut: Biquad,
}

impl DeEsser {
    pub fn new(settings: DeEsserSettings, sample_rate: u32) -> Self {
        Self {
            settings,
            cut: Biquad::new(BiquadCoeffs::peaking(
                settings.frequency,
                settings.q,
                settings.reduction_db,
                sample_rate as f64,
            )),
        }
    }

    pub fn settings(&self) -> &DeEsserSettings {
        &self.settings
    }

    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        for (l, r) in buffer.left.iter_mut().zip(buffer.right.iter_mut()) {
            *l = self.cut.tick(0, *l as f64) as f32;
            *r = self.cut.tick(1, *r as f64) as f32;
        }
    }
}
