//! Dynamic range measurement from a time-domain snapshot
//!
//! Snapshot bytes are unsigned 8-bit samples centered on 128, so
//! `|byte - 128| / 128` recovers the absolute amplitude in 0..1.
//! Crest factor is `peak / (rms + 1e-5)`; heavily limited material sits
//! near 1-3, natural acoustic recordings well above 10.

use serde::Serialize;

/// Added to RMS so silence doesn't divide by zero.
const CREST_EPSILON: f64 = 0.00001;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DynamicsReading {
    pub rms: f64,
    pub peak: f64,
    pub crest_factor: f64,
}

impl DynamicsReading {
    /// Measure a waveform snapshot. An empty snapshot reads as all zeros.
    pub fn measure(waveform_data: &[u8]) -> Self {
        if waveform_data.is_empty() {
            return Self::default();
        }

        let mut sum_squares = 0.0;
        let mut peak = 0.0_f64;
        for &byte in waveform_data {
            let sample = (byte as f64 - 128.0).abs() / 128.0;
            sum_squares += sample * sample;
            peak = peak.max(sample);
        }

        let rms = (sum_squares / waveform_data.len() as f64).sqrt();
        Self {
            rms,
            peak,
            crest_factor: peak / (rms + CREST_EPSILON),
        }
    }

    /// A reading with a given crest factor, for evaluating synthetic cases
    pub fn with_crest_factor(crest_factor: f64) -> Self {
        Self {
            crest_factor,
            ..Self::default()
        }
    }
}
