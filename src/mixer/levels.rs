//! Stem level measurement
//!
//! Loudness is plain RMS over every sample of every channel, in dB with a
//! floor of -100 dB (`20·log10(max(rms, 1e-5))`). It's a rough proxy, not
//! LUFS; the mixer only needs to know which stem is hotter and by how much.

use crate::signal::{rms_to_db, AudioSignal};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StemLevel {
    pub rms: f64,
    pub peak: f64,
    pub loudness_db: f64,
}

impl StemLevel {
    pub fn measure(signal: &AudioSignal) -> Self {
        Self::from_rms_peak(signal.rms(), signal.peak())
    }

    pub fn from_rms_peak(rms: f64, peak: f64) -> Self {
        Self {
            rms,
            peak,
            loudness_db: rms_to_db(rms),
        }
    }
}

/// Which stem is louder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dominance {
    Beat,
    Vocals,
    Balanced,
}

impl std::fmt::Display for Dominance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Dominance::Beat => "beat",
            Dominance::Vocals => "vocals",
            Dominance::Balanced => "balanced",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelAnalysis {
    pub beat: StemLevel,
    pub vocals: StemLevel,
    /// `|beat dB - vocals dB|`
    pub level_difference: f64,
    pub dominant: Dominance,
}

impl LevelAnalysis {
    pub fn measure(beat: &AudioSignal, vocals: &AudioSignal) -> Self {
        Self::from_levels(StemLevel::measure(beat), StemLevel::measure(vocals))
    }

    pub fn from_levels(beat: StemLevel, vocals: StemLevel) -> Self {
        let dominant = if beat.loudness_db > vocals.loudness_db {
            Dominance::Beat
        } else if vocals.loudness_db > beat.loudness_db {
            Dominance::Vocals
        } else {
            Dominance::Balanced
        };

        Self {
            beat,
            vocals,
            level_difference: (beat.loudness_db - vocals.loudness_db).abs(),
            dominant,
        }
    }

    pub fn beat_louder(&self) -> bool {
        self.dominant == Dominance::Beat
    }

    pub fn vocals_louder(&self) -> bool {
        self.dominant == Dominance::Vocals
    }
}
