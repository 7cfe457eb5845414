//! Per-genre mixing parameters and level-adaptive adjustment
//!
//! ```text
//! Genre       Beat: gain  low shelf   high shelf   comp        Vocals: gain  HPF  presence   comp       verb
//! ----------  ----------  ----------  -----------  ----------  ------------  ---  ---------  ---------  ----
//! general     0.52        100Hz +2    8kHz  +0.5   -12dB 3:1   0.38          80   3.5k +1    -10 3:1    0.10
//! hiphop      0.58         80Hz +3    10kHz +1     -10dB 4:1   0.43          60   4k   +1    -8  4:1    0.08
//! pop         0.48        100Hz +1    12kHz +1.5   -14dB 2.5   0.41          100  5k   +1.5  -12 2.5    0.12
//! rock        0.65         80Hz +1    6kHz  0      -16dB 2:1   0.35          80   3k   +0.8  -14 2:1    0.15
//! electronic  0.62         60Hz +3    15kHz +2     -8dB  6:1   0.33          40   6k   +1.8  -6  6:1    0.18
//! rnb         0.52         90Hz +1.5  9kHz  +1     -12dB 3:1   0.45          70   4.5k +1.2  -10 3:1    0.12
//! ```
//!
//! Master gain is 1.3 for every genre. Genres without a row (jazz) mix
//! with the general parameters.
//!
//! # Adjustment
//!
//! A request works on its own copy of the row. [`MixParameters::adjust_for_levels`]
//! runs three steps, in order:
//!
//! 1. **Balance** (only when the stems differ by more than 8 dB): pull the
//!    hot stem down and push the other up, harder when the vocals are the
//!    hot one.
//! 2. **Beat bias**: beat gain ×1.25, vocal gain ×0.85, always.
//! 3. **Compression trim**, per stem: below -20 dB the threshold drops
//!    3 dB; above -6 dB it rises 2 dB and the ratio goes up by 1.

use super::levels::LevelAnalysis;
use crate::genre::Genre;
use serde::Serialize;

/// Stems closer than this are left alone by the balance step
pub const LEVEL_DIFFERENCE_THRESHOLD: f64 = 8.0;

pub const BEAT_BIAS: f64 = 1.25;
pub const VOCAL_BIAS: f64 = 0.85;

const QUIET_LOUDNESS_DB: f64 = -20.0;
const HOT_LOUDNESS_DB: f64 = -6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeatParams {
    pub gain: f64,
    pub low_shelf_freq: f64,
    pub low_shelf_gain: f64,
    pub high_shelf_freq: f64,
    pub high_shelf_gain: f64,
    pub compressor_threshold: f64,
    pub compressor_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VocalParams {
    pub gain: f64,
    pub highpass_freq: f64,
    pub presence_freq: f64,
    pub presence_gain: f64,
    pub compressor_threshold: f64,
    pub compressor_ratio: f64,
    /// Reverb send level; 0 disables the send
    pub reverb_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixParameters {
    pub beat: BeatParams,
    pub vocals: VocalParams,
    pub master_gain: f64,
}

const fn row(beat: [f64; 7], vocals: [f64; 7]) -> MixParameters {
    MixParameters {
        beat: BeatParams {
            gain: beat[0],
            low_shelf_freq: beat[1],
            low_shelf_gain: beat[2],
            high_shelf_freq: beat[3],
            high_shelf_gain: beat[4],
            compressor_threshold: beat[5],
            compressor_ratio: beat[6],
        },
        vocals: VocalParams {
            gain: vocals[0],
            highpass_freq: vocals[1],
            presence_freq: vocals[2],
            presence_gain: vocals[3],
            compressor_threshold: vocals[4],
            compressor_ratio: vocals[5],
            reverb_amount: vocals[6],
        },
        master_gain: 1.3,
    }
}

const GENERAL: MixParameters = row(
    [0.52, 100.0, 2.0, 8000.0, 0.5, -12.0, 3.0],
    [0.38, 80.0, 3500.0, 1.0, -10.0, 3.0, 0.1],
);
const HIPHOP: MixParameters = row(
    [0.58, 80.0, 3.0, 10000.0, 1.0, -10.0, 4.0],
    [0.43, 60.0, 4000.0, 1.0, -8.0, 4.0, 0.08],
);
const POP: MixParameters = row(
    [0.48, 100.0, 1.0, 12000.0, 1.5, -14.0, 2.5],
    [0.41, 100.0, 5000.0, 1.5, -12.0, 2.5, 0.12],
);
const ROCK: MixParameters = row(
    [0.65, 80.0, 1.0, 6000.0, 0.0, -16.0, 2.0],
    [0.35, 80.0, 3000.0, 0.8, -14.0, 2.0, 0.15],
);
const ELECTRONIC: MixParameters = row(
    [0.62, 60.0, 3.0, 15000.0, 2.0, -8.0, 6.0],
    [0.33, 40.0, 6000.0, 1.8, -6.0, 6.0, 0.18],
);
const RNB: MixParameters = row(
    [0.52, 90.0, 1.5, 9000.0, 1.0, -12.0, 3.0],
    [0.45, 70.0, 4500.0, 1.2, -10.0, 3.0, 0.12],
);

impl MixParameters {
    /// A working copy of the genre's row
    pub fn for_genre(genre: Genre) -> Self {
        match genre {
            Genre::General | Genre::Jazz => GENERAL,
            Genre::HipHop => HIPHOP,
            Genre::Pop => POP,
            Genre::Rock => ROCK,
            Genre::Electronic => ELECTRONIC,
            Genre::Rnb => RNB,
        }
    }

    /// Step 1: rebalance stems more than 8 dB apart
    pub fn apply_level_balance(&mut self, levels: &LevelAnalysis) {
        let diff = levels.level_difference;
        if diff <= LEVEL_DIFFERENCE_THRESHOLD {
            return;
        }

        if levels.beat_louder() {
            let adjustment = (diff * 0.02).min(0.15);
            self.beat.gain *= 1.0 - adjustment * 0.5;
            self.vocals.gain *= 1.0 + adjustment * 0.8;
            log::debug!("Beat is {:.1}dB louder - minor adjustment", diff);
        } else {
            let adjustment = (diff * 0.04).min(0.25);
            self.vocals.gain *= 1.0 - adjustment * 1.2;
            self.beat.gain *= 1.0 + adjustment * 0.6;
            log::debug!("Vocals are {:.1}dB louder - reducing vocals more", diff);
        }
    }

    /// Step 2: fixed beat-forward bias
    pub fn apply_beat_bias(&mut self) {
        self.beat.gain *= BEAT_BIAS;
        self.vocals.gain *= VOCAL_BIAS;
    }

    /// Step 3: loosen compression on quiet stems, tighten it on hot ones
    pub fn apply_compression_trim(&mut self, levels: &LevelAnalysis) {
        let beat_db = levels.beat.loudness_db;
        let vocals_db = levels.vocals.loudness_db;

        if beat_db < QUIET_LOUDNESS_DB {
            self.beat.compressor_threshold -= 3.0;
        }
        if vocals_db < QUIET_LOUDNESS_DB {
            self.vocals.compressor_threshold -= 3.0;
        }

        if beat_db > HOT_LOUDNESS_DB {
            self.beat.compressor_threshold += 2.0;
            self.beat.compressor_ratio += 1.0;
        }
        if vocals_db > HOT_LOUDNESS_DB {
            self.vocals.compressor_threshold += 2.0;
            self.vocals.compressor_ratio += 1.0;
        }
    }

    /// All three steps, in order
    pub fn adjust_for_levels(&mut self, levels: &LevelAnalysis) {
        self.apply_level_balance(levels);
        self.apply_beat_bias();
        self.apply_compression_trim(levels);
    }

    /// Base row for `genre`, adjusted for `levels`
    pub fn adjusted(genre: Genre, levels: &LevelAnalysis) -> Self {
        let mut params = Self::for_genre(genre);
        params.adjust_for_levels(levels);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::levels::StemLevel;

    fn levels(beat_db: f64, vocals_db: f64) -> LevelAnalysis {
        let stem = |db: f64| {
            let rms = 10f64.powf(db / 20.0);
            StemLevel::from_rms_peak(rms, rms)
        };
        LevelAnalysis::from_levels(stem(beat_db), stem(vocals_db))
    }

    // ==========================================================================
    // TABLES
    // ==========================================================================

    #[test]
    fn test_jazz_uses_general() {
        assert_eq!(MixParameters::for_genre(Genre::Jazz), MixParameters::for_genre(Genre::General));
    }

    #[test]
    fn test_master_gain_is_genre_independent() {
        for genre in Genre::ALL {
            assert_eq!(MixParameters::for_genre(genre).master_gain, 1.3);
        }
    }

    #[test]
    fn test_rows_are_distinct() {
        for (i, a) in Genre::MIXER.iter().enumerate() {
            for b in &Genre::MIXER[i + 1..] {
                assert_ne!(MixParameters::for_genre(*a), MixParameters::for_genre(*b), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_copies_are_independent() {
        let mut copy = MixParameters::for_genre(Genre::Pop);
        copy.beat.gain = 99.0;
        assert_eq!(MixParameters::for_genre(Genre::Pop).beat.gain, 0.48);
    }

    // ==========================================================================
    // BALANCE STEP
    // ==========================================================================
    //
    // Beat 14 dB hotter:   adj = min(0.28, 0.15) = 0.15
    //                      beat ×0.925, vocals ×1.12
    // Vocals 14 dB hotter: adj = min(0.56, 0.25) = 0.25
    //                      vocals ×0.7, beat ×1.15
    // ==========================================================================

    #[test]
    fn test_beat_louder_raises_vocals() {
        let base = MixParameters::for_genre(Genre::General);
        let mut p = base;
        p.apply_level_balance(&levels(-10.0, -24.0));
        assert!(p.vocals.gain > base.vocals.gain);
        assert!(p.beat.gain < base.beat.gain);
        assert!((p.vocals.gain - base.vocals.gain * 1.12).abs() < 1e-12);
        assert!((p.beat.gain - base.beat.gain * 0.925).abs() < 1e-12);
    }

    #[test]
    fn test_vocals_louder_lowers_vocals() {
        let base = MixParameters::for_genre(Genre::General);
        let mut p = base;
        p.apply_level_balance(&levels(-24.0, -10.0));
        assert!(p.vocals.gain < base.vocals.gain);
        assert!((p.vocals.gain - base.vocals.gain * 0.7).abs() < 1e-12);
        assert!((p.beat.gain - base.beat.gain * 1.15).abs() < 1e-12);
    }

    #[test]
    fn test_small_difference_is_ignored() {
        for genre in Genre::MIXER {
            let base = MixParameters::for_genre(genre);
            let mut p = base;
            p.apply_level_balance(&levels(-12.0, -19.9));
            assert_eq!(p, base);
        }
    }

    #[test]
    fn test_balance_direction_holds_for_every_genre() {
        for genre in Genre::MIXER {
            for diff in [8.5, 10.0, 20.0, 60.0] {
                let base = MixParameters::for_genre(genre);

                let mut beat_hot = base;
                beat_hot.apply_level_balance(&levels(-5.0, -5.0 - diff));
                assert!(beat_hot.vocals.gain > base.vocals.gain, "{} diff {}", genre, diff);

                let mut vocals_hot = base;
                vocals_hot.apply_level_balance(&levels(-5.0 - diff, -5.0));
                assert!(vocals_hot.vocals.gain < base.vocals.gain, "{} diff {}", genre, diff);
            }
        }
    }

    // ==========================================================================
    // BIAS + TRIM
    // ==========================================================================

    #[test]
    fn test_bias_applies_after_balance() {
        let base = MixParameters::for_genre(Genre::General);
        let p = MixParameters::adjusted(Genre::General, &levels(-6.02, -20.0));
        // 13.98 dB apart → balance (×0.925 / ×1.12), then bias (×1.25 / ×0.85)
        assert!((p.beat.gain - base.beat.gain * 0.925 * 1.25).abs() < 1e-9);
        assert!((p.vocals.gain - base.vocals.gain * 1.12 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_compression_trim() {
        // Beat hot (-3 dB), vocals quiet (-30 dB)
        let base = MixParameters::for_genre(Genre::HipHop);
        let mut p = base;
        p.apply_compression_trim(&levels(-3.0, -30.0));
        assert_eq!(p.beat.compressor_threshold, base.beat.compressor_threshold + 2.0);
        assert_eq!(p.beat.compressor_ratio, base.beat.compressor_ratio + 1.0);
        assert_eq!(p.vocals.compressor_threshold, base.vocals.compressor_threshold - 3.0);
        assert_eq!(p.vocals.compressor_ratio, base.vocals.compressor_ratio);
    }

    #[test]
    fn test_mid_levels_leave_compression_alone() {
        let base = MixParameters::for_genre(Genre::Rock);
        let mut p = base;
        p.apply_compression_trim(&levels(-12.0, -15.0));
        assert_eq!(p, base);
    }
}
