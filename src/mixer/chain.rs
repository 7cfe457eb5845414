//! Signal chains as ordered stage descriptors
//!
//! A chain is plain data: a list of [`Stage`]s with explicit numbers. It is
//! built from the adjusted [`MixParameters`](super::params::MixParameters),
//! validated, then rendered by running each stage over the buffer in order.
//!
//! ```text
//! beat    lowshelf → highshelf → compressor (knee 6, 10ms/100ms) → gain
//!
//! vocals  highpass (Q 0.7dB) → peaking presence (Q 1) → de-esser
//!           → compressor (knee 10, 2ms/50ms) ─┬──────────────────┬→ gain
//!                                              └→ reverb × amount ┘
//!
//! master  gain 1.3 → lowshelf +0.5 @60 → peaking -0.5 @250 Q0.5
//!           → peaking +1 @2.5k Q1.2 → highshelf +1.5 @10k
//!           → compressor (-4dB, knee 4, 3:1, 3ms/120ms)
//!           → highshelf +1 @8k (sparkle)
//!           → limiter (-1dB, knee 1, 15:1, 2ms/80ms)
//! ```

use super::params::{BeatParams, VocalParams};
use crate::dsp::biquad::{Biquad, BiquadCoeffs, FilterType};
use crate::dsp::dynamics::{Compressor, CompressorSettings, DeEsser, DeEsserSettings};
use crate::dsp::reverb::{Convolver, ImpulseResponse};
use crate::error::MixingError;
use crate::signal::StereoBuffer;
use serde::Serialize;
use std::time::Instant;

pub const BEAT_KNEE_DB: f64 = 6.0;
pub const BEAT_ATTACK_SECS: f64 = 0.01;
pub const BEAT_RELEASE_SECS: f64 = 0.1;

pub const VOCAL_KNEE_DB: f64 = 10.0;
pub const VOCAL_ATTACK_SECS: f64 = 0.002;
pub const VOCAL_RELEASE_SECS: f64 = 0.05;
/// Highpass resonance, in dB
pub const VOCAL_HIGHPASS_Q: f64 = 0.7;
pub const VOCAL_PRESENCE_Q: f64 = 1.0;

pub const MASTER_COMPRESSOR: CompressorSettings = CompressorSettings::new(-4.0, 4.0, 3.0, 0.003, 0.12);
pub const MASTER_LIMITER: CompressorSettings = CompressorSettings::new(-1.0, 1.0, 15.0, 0.002, 0.08);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "stage", content = "params", rename_all = "snake_case")]
pub enum Stage {
    Filter {
        filter: FilterType,
        frequency: f64,
        q: f64,
        gain_db: f64,
    },
    Compressor(CompressorSettings),
    DeEsser(DeEsserSettings),
    /// Parallel send into the convolution reverb, summed back at `amount`
    ReverbSend {
        amount: f64,
    },
    Gain(f64),
    Limiter(CompressorSettings),
}

impl Stage {
    pub fn filter(filter: FilterType, frequency: f64, q: f64, gain_db: f64) -> Self {
        Stage::Filter {
            filter,
            frequency,
            q,
            gain_db,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Filter { filter, .. } => filter.as_str(),
            Stage::Compressor(_) => "compressor",
            Stage::DeEsser(_) => "de-esser",
            Stage::ReverbSend { .. } => "reverb",
            Stage::Gain(_) => "gain",
            Stage::Limiter(_) => "limiter",
        }
    }

    fn validate(&self, sample_rate: u32) -> Result<(), String> {
        match *self {
            Stage::Filter {
                filter,
                frequency,
                q,
                gain_db,
            } => {
                if !frequency.is_finite() || frequency <= 0.0 {
                    return Err(format!("frequency {}", frequency));
                }
                if !q.is_finite() || !gain_db.is_finite() {
                    return Err(format!("q {} / gain {}dB", q, gain_db));
                }
                if matches!(filter, FilterType::Peaking | FilterType::Bandpass) && q <= 0.0 {
                    return Err(format!("q {} must be positive", q));
                }
                let coeffs = BiquadCoeffs::design(filter, frequency, q, gain_db, sample_rate as f64);
                if !coeffs.is_finite() {
                    return Err("coefficients are not finite".to_string());
                }
                Ok(())
            }
            Stage::Compressor(settings) | Stage::Limiter(settings) => settings.validate(),
            Stage::DeEsser(settings) => {
                let values = [settings.frequency, settings.q, settings.reduction_db];
                if values.iter().any(|v| !v.is_finite()) {
                    return Err("non-finite setting".to_string());
                }
                if settings.frequency <= 0.0 || settings.q <= 0.0 {
                    return Err(format!("frequency {} / q {}", settings.frequency, settings.q));
                }
                Ok(())
            }
            Stage::ReverbSend { amount } => {
                if !amount.is_finite() || !(0.0..=1.0).contains(&amount) {
                    return Err(format!("amount {} outside 0..=1", amount));
                }
                Ok(())
            }
            Stage::Gain(gain) => {
                if !gain.is_finite() || gain < 0.0 {
                    return Err(format!("gain {}", gain));
                }
                Ok(())
            }
        }
    }

    /// Run this stage over `buffer`
    fn render(&self, buffer: &mut StereoBuffer, impulse: Option<&ImpulseResponse>) -> Result<(), String> {
        let sample_rate = buffer.sample_rate;
        match *self {
            Stage::Filter {
                filter,
                frequency,
                q,
                gain_db,
            } => {
                let coeffs = BiquadCoeffs::design(filter, frequency, q, gain_db, sample_rate as f64);
                Biquad::new(coeffs).process(buffer);
            }
            Stage::Compressor(settings) | Stage::Limiter(settings) => {
                Compressor::new(settings, sample_rate).process(buffer);
            }
            Stage::DeEsser(settings) => DeEsser::new(settings, sample_rate).process(buffer),
            Stage::ReverbSend { amount } => {
                if amount > 0.0 {
                    let impulse = impulse.ok_or_else(|| "no impulse response supplied".to_string())?;
                    let convolver = Convolver::new(impulse, sample_rate).map_err(|e| e.to_string())?;
                    convolver.process_send(buffer, amount);
                }
            }
            Stage::Gain(gain) => buffer.scale(gain),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalChain {
    name: &'static str,
    stages: Vec<Stage>,
}

impl SignalChain {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stages: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// True if any stage needs an impulse response to render
    pub fn needs_impulse(&self) -> bool {
        self.stages
            .iter()
            .any(|s| matches!(s, Stage::ReverbSend { amount } if *amount > 0.0))
    }

    pub fn beat(params: &BeatParams) -> Self {
        Self::new("beat")
            .with_stage(Stage::filter(
                FilterType::LowShelf,
                params.low_shelf_freq,
                0.0,
                params.low_shelf_gain,
            ))
            .with_stage(Stage::filter(
                FilterType::HighShelf,
                params.high_shelf_freq,
                0.0,
                params.high_shelf_gain,
            ))
            .with_stage(Stage::Compressor(CompressorSettings::new(
                params.compressor_threshold,
                BEAT_KNEE_DB,
                params.compressor_ratio,
                BEAT_ATTACK_SECS,
                BEAT_RELEASE_SECS,
            )))
            .with_stage(Stage::Gain(params.gain))
    }

    pub fn vocals(params: &VocalParams) -> Self {
        let mut chain = Self::new("vocals")
            .with_stage(Stage::filter(
                FilterType::Highpass,
                params.highpass_freq,
                VOCAL_HIGHPASS_Q,
                0.0,
            ))
            .with_stage(Stage::filter(
                FilterType::Peaking,
                params.presence_freq,
                VOCAL_PRESENCE_Q,
                params.presence_gain,
            ))
            .with_stage(Stage::DeEsser(DeEsserSettings::default()))
            .with_stage(Stage::Compressor(CompressorSettings::new(
                params.compressor_threshold,
                VOCAL_KNEE_DB,
                params.compressor_ratio,
                VOCAL_ATTACK_SECS,
                VOCAL_RELEASE_SECS,
            )));

        if params.reverb_amount > 0.0 {
            chain = chain.with_stage(Stage::ReverbSend {
                amount: params.reverb_amount,
            });
        }

        chain.with_stage(Stage::Gain(params.gain))
    }

    pub fn master(master_gain: f64) -> Self {
        Self::new("master")
            .with_stage(Stage::Gain(master_gain))
            .with_stage(Stage::filter(FilterType::LowShelf, 60.0, 0.0, 0.5))
            .with_stage(Stage::filter(FilterType::Peaking, 250.0, 0.5, -0.5))
            .with_stage(Stage::filter(FilterType::Peaking, 2500.0, 1.2, 1.0))
            .with_stage(Stage::filter(FilterType::HighShelf, 10000.0, 0.0, 1.5))
            .with_stage(Stage::Compressor(MASTER_COMPRESSOR))
            .with_stage(Stage::filter(FilterType::HighShelf, 8000.0, 0.7, 1.0))
            .with_stage(Stage::Limiter(MASTER_LIMITER))
    }

    /// Check every stage for a render at `sample_rate`
    pub fn validate(&self, sample_rate: u32) -> Result<(), MixingError> {
        if sample_rate == 0 {
            return Err(MixingError::InvalidSampleRate(sample_rate));
        }
        for stage in &self.stages {
            stage.validate(sample_rate).map_err(|reason| MixingError::InvalidStage {
                chain: self.name,
                stage: stage.name(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Validate, then run every stage over `buffer` in order
    pub fn render(
        &self,
        buffer: &mut StereoBuffer,
        impulse: Option<&ImpulseResponse>,
    ) -> Result<(), MixingError> {
        self.validate(buffer.sample_rate)?;

        for stage in &self.stages {
            let started = Instant::now();
            stage.render(buffer, impulse).map_err(|reason| MixingError::InvalidStage {
                chain: self.name,
                stage: stage.name(),
                reason,
            })?;
            log::debug!(
                "{} chain: {} stage rendered in {:.1}ms",
                self.name,
                stage.name(),
                started.elapsed().as_secs_f64() * 1000.0
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genre::Genre;
    use crate::mixer::params::MixParameters;

    fn names(chain: &SignalChain) -> Vec<&'static str> {
        chain.stages().iter().map(Stage::name).collect()
    }

    // ==========================================================================
    // CHAIN SHAPE
    // ==========================================================================

    #[test]
    fn test_beat_chain_order() {
        let params = MixParameters::for_genre(Genre::HipHop);
        let chain = SignalChain::beat(&params.beat);
        assert_eq!(names(&chain), vec!["lowshelf", "highshelf", "compressor", "gain"]);
        assert_eq!(
            chain.stages()[2],
            Stage::Compressor(CompressorSettings::new(-10.0, 6.0, 4.0, 0.01, 0.1))
        );
        assert_eq!(chain.stages()[3], Stage::Gain(0.58));
    }

    #[test]
    fn test_vocal_chain_order() {
        let params = MixParameters::for_genre(Genre::Pop);
        let chain = SignalChain::vocals(&params.vocals);
        assert_eq!(
            names(&chain),
            vec!["highpass", "peaking", "de-esser", "compressor", "reverb", "gain"]
        );
        assert!(chain.needs_impulse());
    }

    #[test]
    fn test_zero_reverb_drops_the_send() {
        let mut params = MixParameters::for_genre(Genre::Pop).vocals;
        params.reverb_amount = 0.0;
        let chain = SignalChain::vocals(&params);
        assert!(!names(&chain).contains(&"reverb"));
        assert!(!chain.needs_impulse());
    }

    #[test]
    fn test_master_chain_order() {
        let chain = SignalChain::master(1.3);
        assert_eq!(
            names(&chain),
            vec![
                "gain",
                "lowshelf",
                "peaking",
                "peaking",
                "highshelf",
                "compressor",
                "highshelf",
                "limiter"
            ]
        );
        assert_eq!(chain.stages()[0], Stage::Gain(1.3));
    }

    // ==========================================================================
    // VALIDATION
    // ==========================================================================

    #[test]
    fn test_every_genre_builds_valid_chains() {
        for genre in Genre::ALL {
            let p = MixParameters::for_genre(genre);
            for rate in [22050, 44100, 48000] {
                SignalChain::beat(&p.beat).validate(rate).unwrap();
                SignalChain::vocals(&p.vocals).validate(rate).unwrap();
                SignalChain::master(p.master_gain).validate(rate).unwrap();
            }
        }
    }

    #[test]
    fn test_invalid_stage_names_chain_and_stage() {
        let chain = SignalChain::new("beat").with_stage(Stage::Gain(f64::NAN));
        match chain.validate(44100) {
            Err(MixingError::InvalidStage { chain, stage, .. }) => {
                assert_eq!(chain, "beat");
                assert_eq!(stage, "gain");
            }
            other => panic!("expected InvalidStage, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_compressor_rejected() {
        let chain = SignalChain::new("vocals")
            .with_stage(Stage::Compressor(CompressorSettings::new(-10.0, 10.0, 0.0, 0.002, 0.05)));
        assert!(chain.validate(44100).is_err());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let chain = SignalChain::master(1.3);
        assert!(matches!(chain.validate(0), Err(MixingError::InvalidSampleRate(0))));
    }

    #[test]
    fn test_reverb_without_impulse_fails_render() {
        let chain = SignalChain::new("vocals").with_stage(Stage::ReverbSend { amount: 0.1 });
        let mut buffer = StereoBuffer::silent(100, 44100);
        assert!(matches!(
            chain.render(&mut buffer, None),
            Err(MixingError::InvalidStage { stage: "reverb", .. })
        ));
    }

    // ==========================================================================
    // RENDERING
    // ==========================================================================

    #[test]
    fn test_gain_stage_scales() {
        let chain = SignalChain::new("test").with_stage(Stage::Gain(0.5));
        let mut buffer = StereoBuffer {
            left: vec![0.8; 10],
            right: vec![-0.4; 10],
            sample_rate: 44100,
        };
        chain.render(&mut buffer, None).unwrap();
        assert!(buffer.left.iter().all(|&s| (s - 0.4).abs() < 1e-7));
        assert!(buffer.right.iter().all(|&s| (s + 0.2).abs() < 1e-7));
    }

    #[test]
    fn test_silence_through_every_chain() {
        let p = MixParameters::for_genre(Genre::Electronic);
        let impulse = ImpulseResponse::generate(8000, Some(1));
        for chain in [
            SignalChain::beat(&p.beat),
            SignalChain::vocals(&p.vocals),
            SignalChain::master(p.master_gain),
        ] {
            let mut buffer = StereoBuffer::silent(4000, 8000);
            chain.render(&mut buffer, Some(&impulse)).unwrap();
            assert!(
                buffer.left.iter().chain(buffer.right.iter()).all(|&s| s == 0.0),
                "{} chain made noise from silence",
                chain.name()
            );
        }
    }

    #[test]
    fn test_limiter_output_follows_static_curves() {
        let chain = SignalChain::master(1.3);
        let mut buffer = StereoBuffer {
            left: vec![0.9; 44100],
            right: vec![0.9; 44100],
            sample_rate: 44100,
        };
        chain.render(&mut buffer, None).unwrap();

        // DC sees only the gain and the +0.5 dB low shelf before the dynamics
        let input_db = 20.0 * (0.9f64 * 1.3).log10() + 0.5;
        let compressed = MASTER_COMPRESSOR.output_level_db(input_db) + MASTER_COMPRESSOR.makeup_gain_db();
        let limited = MASTER_LIMITER.output_level_db(compressed) + MASTER_LIMITER.makeup_gain_db();
        let expected = 10f64.powf(limited / 20.0);

        let tail = buffer.left[40000..].iter().fold(0.0f32, |m, s| m.max(s.abs())) as f64;
        assert!((tail - expected).abs() < 0.005, "settled {} vs {}", tail, expected);
        assert!(tail < 1.0, "limiter should keep DC under full scale");
    }
}
