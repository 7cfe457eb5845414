//! Second-order IIR filters
//!
//! Coefficients follow the Audio EQ Cookbook as used by Web Audio's
//! `BiquadFilterNode`, so a chain described in its terms sounds the same:
//!
//! ```text
//! Type        alpha                       Q / gain used
//! ----------  --------------------------  ---------------------------
//! lowshelf    sin(w0)/2 · √2   (S = 1)    gain only, A = 10^(G/40)
//! highshelf   sin(w0)/2 · √2   (S = 1)    gain only
//! peaking     sin(w0) / (2Q)              Q and gain
//! highpass    sin(w0) / (2·10^(Q/20))     Q in dB, no gain
//! bandpass    sin(w0) / (2Q)              Q only, 0 dB peak
//! ```
//!
//! At 0 Hz and at/above Nyquist each filter degenerates to a constant gain
//! (e.g. a high shelf above Nyquist is a wire, a low shelf there is a flat
//! `A²` gain).
//!
//! Processing uses Direct Form I with one state per channel.

use crate::signal::StereoBuffer;
use rustfft::num_complex::Complex;
use serde::Serialize;
use std::f64::consts::{PI, SQRT_2};

/// Smallest Q accepted for peaking/bandpass designs
const MIN_Q: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    LowShelf,
    HighShelf,
    Peaking,
    Highpass,
    Bandpass,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::LowShelf => "lowshelf",
            FilterType::HighShelf => "highshelf",
            FilterType::Peaking => "peaking",
            FilterType::Highpass => "highpass",
            FilterType::Bandpass => "bandpass",
        }
    }
}

impl std::fmt::Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized coefficients (`a0 == 1`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    pub fn identity() -> Self {
        Self::constant(1.0)
    }

    /// A filter that just multiplies by `gain`
    pub fn constant(gain: f64) -> Self {
        Self {
            b0: gain,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv = 1.0 / a0;
        Self {
            b0: b0 * inv,
            b1: b1 * inv,
            b2: b2 * inv,
            a1: a1 * inv,
            a2: a2 * inv,
        }
    }

    /// Design a filter. `q` is ignored by the shelves, `gain_db` by
    /// highpass and bandpass.
    pub fn design(filter: FilterType, frequency: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        match filter {
            FilterType::LowShelf => Self::low_shelf(frequency, gain_db, sample_rate),
            FilterType::HighShelf => Self::high_shelf(frequency, gain_db, sample_rate),
            FilterType::Peaking => Self::peaking(frequency, q, gain_db, sample_rate),
            FilterType::Highpass => Self::highpass(frequency, q, sample_rate),
            FilterType::Bandpass => Self::bandpass(frequency, q, sample_rate),
        }
    }

    /// Normalized frequency `f / nyquist`
    fn normalized_frequency(frequency: f64, sample_rate: f64) -> f64 {
        (frequency / (sample_rate / 2.0)).max(0.0)
    }

    pub fn low_shelf(frequency: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let nf = Self::normalized_frequency(frequency, sample_rate);
        if nf >= 1.0 {
            return Self::constant(a * a);
        }
        if nf <= 0.0 {
            return Self::identity();
        }

        let w0 = PI * nf;
        let cos = w0.cos();
        let alpha = w0.sin() / 2.0 * SQRT_2;
        let k = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * cos + k),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
            a * ((a + 1.0) - (a - 1.0) * cos - k),
            (a + 1.0) + (a - 1.0) * cos + k,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos),
            (a + 1.0) + (a - 1.0) * cos - k,
        )
    }

    pub fn high_shelf(frequency: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let nf = Self::normalized_frequency(frequency, sample_rate);
        if nf >= 1.0 {
            return Self::identity();
        }
        if nf <= 0.0 {
            return Self::constant(a * a);
        }

        let w0 = PI * nf;
        let cos = w0.cos();
        let alpha = w0.sin() / 2.0 * SQRT_2;
        let k = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cos + k),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
            a * ((a + 1.0) + (a - 1.0) * cos - k),
            (a + 1.0) - (a - 1.0) * cos + k,
            2.0 * ((a - 1.0) - (a + 1.0) * cos),
            (a + 1.0) - (a - 1.0) * cos - k,
        )
    }

    pub fn peaking(frequency: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let nf = Self::normalized_frequency(frequency, sample_rate);
        if nf <= 0.0 || nf >= 1.0 {
            return Self::identity();
        }

        let w0 = PI * nf;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q.max(MIN_Q));

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos,
            1.0 - alpha / a,
        )
    }

    /// `q_db` is the resonance in dB at the corner (0.7 dB ≈ Butterworth-ish)
    pub fn highpass(frequency: f64, q_db: f64, sample_rate: f64) -> Self {
        let nf = Self::normalized_frequency(frequency, sample_rate);
        if nf >= 1.0 {
            return Self::constant(0.0);
        }
        if nf <= 0.0 {
            return Self::identity();
        }

        let w0 = PI * nf;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * 10f64.powf(q_db / 20.0));

        Self::normalized(
            (1.0 + cos) / 2.0,
            -(1.0 + cos),
            (1.0 + cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    pub fn bandpass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let nf = Self::normalized_frequency(frequency, sample_rate);
        if nf <= 0.0 || nf >= 1.0 {
            return Self::constant(0.0);
        }

        let w0 = PI * nf;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q.max(MIN_Q));

        Self::normalized(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
    }

    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Magnitude response in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        20.0 * (num.norm() / den.norm()).max(1e-12).log10()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FilterState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl FilterState {
    #[inline]
    fn tick(&mut self, c: &BiquadCoeffs, x: f64) -> f64 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// A stereo biquad: shared coefficients, independent per-channel state
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    state: [FilterState; 2],
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: [FilterState::default(); 2],
        }
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Filter one sample on `channel` (0 = left, 1 = right)
    #[inline]
    pub fn tick(&mut self, channel: usize, x: f64) -> f64 {
        self.state[channel & 1].tick(&self.coeffs, x)
    }

    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        let coeffs = self.coeffs;
        let [left_state, right_state] = &mut self.state;
        for s in buffer.left.iter_mut() {
            *s = left_state.tick(&coeffs, *s as f64) as f32;
        }
        for s in buffer.right.iter_mut() {
            *s = right_state.tick(&coeffs, *s as f64) as f32;
        }
    }

    pub fn reset(&mut self) {
        self.state = [FilterState::default(); 2];
    }
}
