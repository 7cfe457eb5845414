//! Genre-aware spectral and dynamics analysis
//!
//! Each call takes one spectrum snapshot and one waveform snapshot and turns
//! them into a list of [`Insight`]s:
//!
//! ```text
//! spectrum bytes ──► BandEnergies ──┐
//!                                   ├──► rules (genre profile) ──► insights
//! waveform bytes ──► DynamicsReading┘
//! ```
//!
//! The only state is the active genre. It lives in an atomic so the host
//! can switch genres while another thread is analyzing; a single call reads
//! it once and uses that value throughout.
//!
//! Malformed snapshots never fail: they measure as zero energy / zero crest
//! factor and the rules run on those readings.

pub mod bands;
pub mod dynamics;
pub mod insight;
pub mod profile;
pub mod snapshot;

pub use bands::{BandEnergies, FrequencyBand};
pub use dynamics::DynamicsReading;
pub use insight::{priority_insights, Insight, InsightKind, Severity};
pub use profile::{BandThresholds, CrestThresholds, GenreProfile};
pub use snapshot::{Snapshot, SnapshotAnalyser};

use crate::genre::Genre;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Everything measured and concluded from one snapshot pair
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub genre: Genre,
    pub bands: BandEnergies,
    pub dynamics: DynamicsReading,
    pub insights: Vec<Insight>,
}

impl Analysis {
    pub fn count(&self, severity: Severity) -> usize {
        self.insights.iter().filter(|i| i.severity == severity).count()
    }
}

/// Analyze a snapshot pair for an explicit genre
pub fn analyze(frequency_data: &[u8], waveform_data: &[u8], sample_rate: f64, genre: Genre) -> Analysis {
    let bands = BandEnergies::measure(frequency_data, sample_rate);
    let dynamics = DynamicsReading::measure(waveform_data);
    let insights = insight::evaluate(&bands, &dynamics, genre);

    Analysis {
        genre,
        bands,
        dynamics,
        insights,
    }
}

/// Insights for a snapshot pair and an explicit genre
pub fn generate_insights(
    frequency_data: &[u8],
    waveform_data: &[u8],
    sample_rate: f64,
    genre: Genre,
) -> Vec<Insight> {
    analyze(frequency_data, waveform_data, sample_rate, genre).insights
}

#[derive(Debug)]
pub struct Analyzer {
    genre: AtomicU8,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            genre: AtomicU8::new(Genre::General.to_index()),
        }
    }

    pub fn with_genre(self, genre: Genre) -> Self {
        self.set_genre(genre);
        self
    }

    /// Switch genre. Calls already in flight keep the genre they started with.
    pub fn set_genre(&self, genre: Genre) {
        self.genre.store(genre.to_index(), Ordering::Relaxed);
        log::debug!("Analyzer genre set to {}", genre);
    }

    pub fn genre(&self) -> Genre {
        Genre::from_index(self.genre.load(Ordering::Relaxed))
    }

    pub fn analyze(&self, frequency_data: &[u8], waveform_data: &[u8], sample_rate: f64) -> Analysis {
        analyze(frequency_data, waveform_data, sample_rate, self.genre())
    }

    pub fn analyze_snapshot(&self, snapshot: &Snapshot) -> Analysis {
        self.analyze(&snapshot.frequency, &snapshot.waveform, snapshot.sample_rate)
    }

    pub fn generate_insights(
        &self,
        frequency_data: &[u8],
        waveform_data: &[u8],
        sample_rate: f64,
    ) -> Vec<Insight> {
        self.analyze(frequency_data, waveform_data, sample_rate).insights
    }
}
