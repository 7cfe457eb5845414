//! FixMyMix - mix feedback and two-stem auto-mixing
//!
//! FixMyMix does two things with audio:
//!
//! 1. **Analysis**: turns a spectrum snapshot and a waveform snapshot into
//!    plain-language feedback ("Muddy Low End Detected", "Heavily
//!    Compressed", ...) judged against genre-specific targets.
//!
//! 2. **Mixing**: takes a beat and a vocal take, balances them against each
//!    other, runs each through an EQ/compression chain, sums them and
//!    masters the result into a 16-bit stereo WAV.
//!
//! # Quick Start
//!
//! ```no_run
//! use fixmymix::{Analyzer, AudioSignal, Genre, Mixer, SnapshotAnalyser};
//!
//! // Feedback on a mix, 30 seconds in
//! let signal = AudioSignal::decode_file("mix.wav")?;
//! let snapshot = SnapshotAnalyser::new().capture(&signal, 30.0);
//! let analysis = Analyzer::new().with_genre(Genre::HipHop).analyze_snapshot(&snapshot);
//! for insight in fixmymix::priority_insights(&analysis.insights, 3) {
//!     println!("[{}] {}: {}", insight.severity, insight.title, insight.remedy);
//! }
//!
//! // Mix a beat and a vocal take
//! let wav = Mixer::new().mix_files("beat.mp3", "vocals.wav", Genre::HipHop)?;
//! std::fs::write("mix_out.wav", wav)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Genres
//!
//! | Genre      | Analyzer profile | Mixer parameters |
//! |------------|------------------|------------------|
//! | general    | yes              | yes              |
//! | hiphop     | yes              | yes              |
//! | pop        | yes              | yes              |
//! | rock       | yes              | yes              |
//! | electronic | yes              | yes              |
//! | jazz       | yes              | general          |
//! | rnb        | general          | yes              |
//!
//! # Modules
//!
//! - [`analyzer`]: band energies, crest factor, insight rules, snapshots
//! - [`dsp`]: biquad filters, compressor/de-esser, convolution reverb
//! - [`mixer`]: level analysis, parameter adjustment, signal chains
//! - [`wav`]: 16-bit PCM WAV encoder
//! - [`report`]: JSON and CSV reports for timeline analyses

pub mod analyzer;
pub mod dsp;
pub mod error;
pub mod genre;
pub mod mixer;
pub mod report;
pub mod signal;
pub mod wav;

pub use analyzer::{
    priority_insights, Analysis, Analyzer, BandEnergies, DynamicsReading, FrequencyBand, Insight,
    InsightKind, Severity, Snapshot, SnapshotAnalyser,
};
pub use dsp::ImpulseResponse;
pub use error::{DecodeError, EncodingError, Error, MixingError, Result};
pub use genre::Genre;
pub use mixer::{default_output_name, LevelAnalysis, MixParameters, MixReport, Mixer, RenderedMix};
pub use signal::{AudioSignal, StereoBuffer};
