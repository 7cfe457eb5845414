//! Genre-indexed threshold tables for the analyzer
//!
//! Band thresholds are on the 0-255 magnitude scale of a spectrum snapshot.
//! Crest factor thresholds are plain peak/RMS ratios.

use crate::genre::Genre;
use serde::Serialize;

/// Energy thresholds for one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandThresholds {
    pub low: f64,
    pub optimal: f64,
    pub high: f64,
}

/// Peak-to-RMS thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrestThresholds {
    pub over_compressed: f64,
    pub optimal: f64,
    pub very_dynamic: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenreProfile {
    pub bass: BandThresholds,
    pub low_mids: BandThresholds,
    pub upper_mids: BandThresholds,
    pub presence: BandThresholds,
    pub brilliance: BandThresholds,
    pub crest_factor: CrestThresholds,
}

const fn band(low: f64, optimal: f64, high: f64) -> BandThresholds {
    BandThresholds { low, optimal, high }
}

const fn crest(over_compressed: f64, optimal: f64, very_dynamic: f64) -> CrestThresholds {
    CrestThresholds {
        over_compressed,
        optimal,
        very_dynamic,
    }
}

const GENERAL: GenreProfile = GenreProfile {
    bass: band(70.0, 140.0, 210.0),
    low_mids: band(70.0, 130.0, 190.0),
    upper_mids: band(90.0, 150.0, 200.0),
    presence: band(80.0, 130.0, 190.0),
    brilliance: band(60.0, 110.0, 170.0),
    crest_factor: crest(2.5, 7.0, 18.0),
};

const HIPHOP: GenreProfile = GenreProfile {
    bass: band(90.0, 200.0, 240.0),
    low_mids: band(90.0, 180.0, 230.0),
    upper_mids: band(110.0, 170.0, 210.0),
    presence: band(100.0, 150.0, 200.0),
    brilliance: band(80.0, 130.0, 180.0),
    crest_factor: crest(2.0, 5.5, 12.0),
};

const ROCK: GenreProfile = GenreProfile {
    bass: band(80.0, 150.0, 200.0),
    low_mids: band(80.0, 150.0, 190.0),
    upper_mids: band(100.0, 160.0, 210.0),
    presence: band(90.0, 140.0, 200.0),
    brilliance: band(70.0, 120.0, 170.0),
    crest_factor: crest(3.0, 8.0, 18.0),
};

const ELECTRONIC: GenreProfile = GenreProfile {
    bass: band(80.0, 180.0, 230.0),
    low_mids: band(60.0, 120.0, 180.0),
    upper_mids: band(80.0, 140.0, 190.0),
    presence: band(90.0, 150.0, 210.0),
    brilliance: band(80.0, 140.0, 190.0),
    crest_factor: crest(2.0, 6.0, 14.0),
};

const JAZZ: GenreProfile = GenreProfile {
    bass: band(60.0, 120.0, 170.0),
    low_mids: band(60.0, 120.0, 160.0),
    upper_mids: band(70.0, 130.0, 180.0),
    presence: band(70.0, 120.0, 180.0),
    brilliance: band(60.0, 110.0, 160.0),
    crest_factor: crest(5.0, 12.0, 22.0),
};

const POP: GenreProfile = GenreProfile {
    bass: band(75.0, 150.0, 220.0),
    low_mids: band(70.0, 140.0, 210.0),
    upper_mids: band(90.0, 160.0, 220.0),
    presence: band(90.0, 150.0, 210.0),
    brilliance: band(75.0, 130.0, 190.0),
    crest_factor: crest(2.5, 6.5, 15.0),
};

impl GenreProfile {
    /// Threshold profile for `genre`. R&B has no analyzer profile and uses
    /// the general one.
    pub fn for_genre(genre: Genre) -> &'static GenreProfile {
        match genre {
            Genre::General | Genre::Rnb => &GENERAL,
            Genre::HipHop => &HIPHOP,
            Genre::Pop => &POP,
            Genre::Rock => &ROCK,
            Genre::Electronic => &ELECTRONIC,
            Genre::Jazz => &JAZZ,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_ordered() {
        for genre in Genre::ALL {
            let p = GenreProfile::for_genre(genre);
            for b in [p.bass, p.low_mids, p.upper_mids, p.presence, p.brilliance] {
                assert!(b.low < b.optimal && b.optimal < b.high, "{:?}: {:?}", genre, b);
            }
            let c = p.crest_factor;
            assert!(c.over_compressed < c.optimal && c.optimal < c.very_dynamic);
        }
    }

    #[test]
    fn test_rnb_uses_general_profile() {
        assert_eq!(
            GenreProfile::for_genre(Genre::Rnb),
            GenreProfile::for_genre(Genre::General)
        );
    }

    #[test]
    fn test_hiphop_tolerates_more_bass() {
        let general = GenreProfile::for_genre(Genre::General);
        let hiphop = GenreProfile::for_genre(Genre::HipHop);
        assert!(hiphop.bass.high > general.bass.high);
        assert!(hiphop.crest_factor.over_compressed < general.crest_factor.over_compressed);
    }
}
