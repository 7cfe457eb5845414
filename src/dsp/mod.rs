//! Offline signal processing stages
//!
//! Every processor works in place on a [`StereoBuffer`](crate::signal::StereoBuffer),
//! computes in `f64` and keeps its own per-channel state, so a processor
//! instance belongs to exactly one render.
//!
//! - [`biquad`]: second-order filters (shelves, peaking, high-pass, band-pass)
//! - [`dynamics`]: feed-forward compressor / limiter and the de-esser
//! - [`reverb`]: noise impulse responses and FFT convolution

pub mod biquad;
pub mod dynamics;
pub mod reverb;

pub use biquad::{Biquad, BiquadCoeffs, FilterType};
pub use dynamics::{Compressor, CompressorSettings, DeEsser};
pub use reverb::{Convolver, ImpulseResponse};

/// `exp(-1 / (τ·fs))`: one-pole smoothing coefficient for time constant τ.
/// A zero (or negative) time constant gives 0, i.e. no smoothing.
pub(crate) fn time_coefficient(time_secs: f64, sample_rate: f64) -> f64 {
    if time_secs <= 0.0 || sample_rate <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_secs * sample_rate)).exp()
    }
}
