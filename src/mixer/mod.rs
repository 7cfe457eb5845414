//! Offline two-stem mixing
//!
//! One request takes a beat and a vocal take and returns a mastered stereo
//! WAV:
//!
//! ```text
//! beat ──► levels ─┐                    ┌─► beat chain ───┐
//!                  ├─► MixParameters ───┤                 ├─► sum ─► master chain ─► WAV
//! vocals ► levels ─┘   (genre, adjusted)└─► vocal chain ──┘
//! ```
//!
//! Everything a request touches (parameter copy, chains, buffers) is its
//! own, so any number of requests can run at once. The two stem chains
//! share nothing and render in parallel.
//!
//! # Rendering
//!
//! - Render rate: the lower of the two stem rates, unless forced with
//!   [`Mixer::with_sample_rate`]. Stems at another rate are resampled
//!   linearly.
//! - Length: the longer stem; the shorter one is padded with silence.
//! - Mono stems are duplicated to both sides, extra channels are dropped.
//!
//! # Reproducibility
//!
//! Everything is deterministic except the reverb's noise impulse response.
//! Give the mixer a seed or an explicit [`ImpulseResponse`] for bit-exact
//! output.

pub mod chain;
pub mod levels;
pub mod params;

pub use chain::{SignalChain, Stage};
pub use levels::{Dominance, LevelAnalysis, StemLevel};
pub use params::{BeatParams, MixParameters, VocalParams};

use crate::dsp::reverb::ImpulseResponse;
use crate::error::{MixingError, Result};
use crate::genre::Genre;
use crate::signal::{AudioSignal, StereoBuffer};
use crate::wav;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// The mixed stereo buffer, before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMix {
    buffer: StereoBuffer,
}

impl RenderedMix {
    pub fn buffer(&self) -> &StereoBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> StereoBuffer {
        self.buffer
    }

    pub fn frames(&self) -> usize {
        self.buffer.frames()
    }

    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }

    /// Encode to WAV, consuming the mix
    pub fn encode(self) -> Result<Vec<u8>> {
        Ok(wav::encode(&self.buffer)?)
    }
}

/// What a render measured and decided
#[derive(Debug, Clone, Serialize)]
pub struct MixReport {
    pub genre: Genre,
    pub levels: LevelAnalysis,
    pub parameters: MixParameters,
    pub sample_rate: u32,
    pub frames: usize,
    pub duration_secs: f64,
    pub peak: f64,
    pub render_ms: f64,
}

/// Suggested download name, `FixMyMix_<genre>_<YYYYmmdd_HHMMSS>.wav`
pub fn default_output_name(genre: Genre) -> String {
    format!(
        "FixMyMix_{}_{}.wav",
        genre,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

#[derive(Debug, Clone, Default)]
pub struct Mixer {
    seed: Option<u64>,
    impulse: Option<ImpulseResponse>,
    sample_rate: Option<u32>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the reverb's noise impulse response
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use this impulse response for the vocal reverb instead of noise
    pub fn with_impulse(mut self, impulse: ImpulseResponse) -> Self {
        self.impulse = Some(impulse);
        self
    }

    /// Render at this rate instead of the lower stem rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    fn render_rate(&self, beat: &AudioSignal, vocals: &AudioSignal) -> std::result::Result<u32, MixingError> {
        let rate = self
            .sample_rate
            .unwrap_or_else(|| beat.sample_rate().min(vocals.sample_rate()));
        if rate == 0 {
            return Err(MixingError::InvalidSampleRate(rate));
        }
        Ok(rate)
    }

    fn impulse_for(&self, sample_rate: u32) -> ImpulseResponse {
        match &self.impulse {
            Some(ir) => ir.clone(),
            None => ImpulseResponse::generate(sample_rate, self.seed),
        }
    }

    /// Mix and master, returning the un-encoded buffer and what was decided
    pub fn render(
        &self,
        beat: &AudioSignal,
        vocals: &AudioSignal,
        genre: Genre,
    ) -> Result<(RenderedMix, MixReport)> {
        let started = Instant::now();

        if beat.frames() == 0 {
            return Err(MixingError::EmptyStem("beat").into());
        }
        if vocals.frames() == 0 {
            return Err(MixingError::EmptyStem("vocals").into());
        }

        let levels = LevelAnalysis::measure(beat, vocals);
        log::info!(
            "Level analysis: beat {:.1}dB, vocals {:.1}dB, difference {:.1}dB",
            levels.beat.loudness_db,
            levels.vocals.loudness_db,
            levels.level_difference
        );

        let parameters = MixParameters::adjusted(genre, &levels);
        log::debug!("Adjusted parameters for {}: {:?}", genre, parameters);

        let sample_rate = self.render_rate(beat, vocals)?;
        let beat_chain = SignalChain::beat(&parameters.beat);
        let vocal_chain = SignalChain::vocals(&parameters.vocals);
        let master_chain = SignalChain::master(parameters.master_gain);

        // Fail before doing any work
        for chain in [&beat_chain, &vocal_chain, &master_chain] {
            chain.validate(sample_rate)?;
        }

        let mut beat_buffer = beat.to_stereo(sample_rate);
        let mut vocal_buffer = vocals.to_stereo(sample_rate);
        let frames = beat_buffer.frames().max(vocal_buffer.frames());
        beat_buffer.fit_to(frames);
        vocal_buffer.fit_to(frames);
        log::debug!(
            "Rendering {} frames at {}Hz ({} chain stages)",
            frames,
            sample_rate,
            beat_chain.stages().len() + vocal_chain.stages().len() + master_chain.stages().len()
        );

        let impulse = vocal_chain
            .needs_impulse()
            .then(|| self.impulse_for(sample_rate));

        let (beat_result, vocal_result) = rayon::join(
            || render_stem(&beat_chain, &mut beat_buffer, None),
            || render_stem(&vocal_chain, &mut vocal_buffer, impulse.as_ref()),
        );
        beat_result?;
        vocal_result?;

        let mut master = sum(&beat_buffer, &vocal_buffer)?;
        render_stem(&master_chain, &mut master, None)?;

        let report = MixReport {
            genre,
            levels,
            parameters,
            sample_rate,
            frames: master.frames(),
            duration_secs: master.duration_secs(),
            peak: master.peak(),
            render_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        log::debug!(
            "Mix rendered in {:.0}ms, output peak {:.3}",
            report.render_ms,
            report.peak
        );

        Ok((RenderedMix { buffer: master }, report))
    }

    /// Mix two decoded stems into a WAV file
    pub fn mix(&self, beat: &AudioSignal, vocals: &AudioSignal, genre: Genre) -> Result<Vec<u8>> {
        let (mix, _) = self.render(beat, vocals, genre)?;
        mix.encode()
    }

    /// Decode both files, then mix them
    pub fn mix_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        beat_path: P,
        vocals_path: Q,
        genre: Genre,
    ) -> Result<Vec<u8>> {
        let (beat_path, vocals_path) = (beat_path.as_ref(), vocals_path.as_ref());
        let (beat, vocals) = rayon::join(
            || AudioSignal::decode_file(beat_path),
            || AudioSignal::decode_file(vocals_path),
        );
        self.mix(&beat?, &vocals?, genre)
    }
}

/// Render one chain, wrapping any failure with the chain's name
fn render_stem(
    chain: &SignalChain,
    buffer: &mut StereoBuffer,
    impulse: Option<&ImpulseResponse>,
) -> std::result::Result<(), MixingError> {
    chain
        .render(buffer, impulse)
        .map_err(|source| MixingError::Render {
            chain: chain.name(),
            source: Box::new(source),
        })
}

/// Master bus input: the two stems summed sample by sample
fn sum(beat: &StereoBuffer, vocals: &StereoBuffer) -> std::result::Result<StereoBuffer, MixingError> {
    if beat.frames() != vocals.frames() {
        return Err(MixingError::LengthMismatch {
            beat: beat.frames(),
            vocals: vocals.frames(),
        });
    }

    let add = |a: &[f32], b: &[f32]| -> Vec<f32> { a.iter().zip(b).map(|(x, y)| x + y).collect() };
    Ok(StereoBuffer {
        left: add(&beat.left, &vocals.left),
        right: add(&beat.right, &vocals.right),
        sample_rate: beat.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn tone(freq: f64, amplitude: f32, channels: usize, frames: usize, sample_rate: u32) -> AudioSignal {
        let samples: Vec<f32> = (0..frames)
            .map(|i| {
                amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin() as f32
            })
            .collect();
        AudioSignal::from_channels(vec![samples; channels], sample_rate).unwrap()
    }

    // ==========================================================================
    // SHAPE OF THE OUTPUT
    // ==========================================================================

    #[test]
    fn test_length_follows_longer_stem() {
        let beat = AudioSignal::constant(0.0, 2, 8000, 8000);
        let vocals = AudioSignal::constant(0.0, 1, 4000, 8000);
        let (mix, report) = Mixer::new().with_seed(1).render(&beat, &vocals, Genre::General).unwrap();
        assert_eq!(mix.frames(), 8000);
        assert_eq!(report.frames, 8000);
        assert!((mix.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_rate_is_lowest_stem_rate() {
        let beat = AudioSignal::constant(0.0, 2, 16000, 16000);
        let vocals = AudioSignal::constant(0.0, 2, 8000, 8000);
        let (mix, _) = Mixer::new().with_seed(1).render(&beat, &vocals, Genre::Pop).unwrap();
        assert_eq!(mix.sample_rate(), 8000);
        assert_eq!(mix.frames(), 8000);
    }

    #[test]
    fn test_forced_rate() {
        let beat = AudioSignal::constant(0.0, 2, 8000, 8000);
        let vocals = AudioSignal::constant(0.0, 2, 8000, 8000);
        let (mix, _) = Mixer::new()
            .with_seed(1)
            .with_sample_rate(16000)
            .render(&beat, &vocals, Genre::Rock)
            .unwrap();
        assert_eq!(mix.sample_rate(), 16000);
        assert_eq!(mix.frames(), 16000);
    }

    // ==========================================================================
    // REPRODUCIBILITY
    // ==========================================================================
    //
    // The reverb IR is the only random input. Same seed → identical bytes.
    // ==========================================================================

    #[test]
    fn test_seeded_mix_is_reproducible() {
        let beat = tone(110.0, 0.4, 2, 8000, 8000);
        let vocals = tone(440.0, 0.2, 1, 8000, 8000);
        let a = Mixer::new().with_seed(9).mix(&beat, &vocals, Genre::HipHop).unwrap();
        let b = Mixer::new().with_seed(9).mix(&beat, &vocals, Genre::HipHop).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_injected_impulse_is_used() {
        let beat = tone(110.0, 0.4, 2, 8000, 8000);
        let vocals = tone(440.0, 0.2, 1, 8000, 8000);
        let dirac = ImpulseResponse::from_channels(vec![vec![1.0]], 8000).unwrap();
        let a = Mixer::new().with_impulse(dirac.clone()).mix(&beat, &vocals, Genre::Pop).unwrap();
        let b = Mixer::new().with_impulse(dirac).mix(&beat, &vocals, Genre::Pop).unwrap();
        assert_eq!(a, b);
    }

    // ==========================================================================
    // REPORT
    // ==========================================================================

    #[test]
    fn test_report_carries_adjusted_parameters() {
        let beat = AudioSignal::constant(0.5, 2, 8000, 8000);
        let vocals = AudioSignal::constant(0.1, 2, 8000, 8000);
        let (_, report) = Mixer::new().with_seed(3).render(&beat, &vocals, Genre::General).unwrap();

        assert_eq!(report.levels.dominant, Dominance::Beat);
        assert!((report.levels.level_difference - 13.98).abs() < 0.01);

        let base = MixParameters::for_genre(Genre::General);
        assert!((report.parameters.beat.gain - base.beat.gain * 0.925 * 1.25).abs() < 1e-9);
        assert!((report.parameters.vocals.gain - base.vocals.gain * 1.12 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_report_peak_matches_buffer() {
        let beat = tone(60.0, 0.9, 2, 16000, 8000);
        let vocals = tone(300.0, 0.9, 2, 16000, 8000);
        let (mix, report) = Mixer::new().with_seed(5).render(&beat, &vocals, Genre::Electronic).unwrap();
        assert!(report.peak.is_finite() && report.peak > 0.0, "peak {}", report.peak);
        assert_eq!(report.peak, mix.buffer().peak());
        assert_eq!(mix.buffer().left.len(), mix.buffer().right.len());
    }

    // ==========================================================================
    // FAILURES
    // ==========================================================================

    #[test]
    fn test_empty_stem_fails() {
        let beat = AudioSignal::constant(0.0, 2, 0, 44100);
        let vocals = AudioSignal::constant(0.0, 2, 100, 44100);
        match Mixer::new().mix(&beat, &vocals, Genre::General) {
            Err(Error::Mixing(MixingError::EmptyStem(stem))) => assert_eq!(stem, "beat"),
            other => panic!("expected EmptyStem, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_zero_forced_rate_fails() {
        let signal = AudioSignal::constant(0.0, 2, 100, 44100);
        let result = Mixer::new().with_sample_rate(0).mix(&signal, &signal, Genre::General);
        assert!(matches!(result, Err(Error::Mixing(MixingError::InvalidSampleRate(0)))));
    }

    #[test]
    fn test_sum_rejects_mismatched_lengths() {
        let a = StereoBuffer::silent(10, 44100);
        let b = StereoBuffer::silent(11, 44100);
        assert!(matches!(sum(&a, &b), Err(MixingError::LengthMismatch { beat: 10, vocals: 11 })));
    }

    #[test]
    fn test_default_output_name() {
        let name = default_output_name(Genre::HipHop);
        assert!(name.starts_with("FixMyMix_hiphop_"));
        assert!(name.ends_with(".wav"));
        // FixMyMix_hiphop_YYYYmmdd_HHMMSS.wav
        assert_eq!(name.len(), "FixMyMix_hiphop_".len() + 15 + 4);
    }
}
