//! Heuristic mixing rules and the advice they produce
//!
//! Rules run in a fixed order and each one may append an insight
//! independently, so a single snapshot can raise several. Order matters:
//! [`priority_insights`] keeps it within a severity level.
//!
//! | Rule | Fires when | Severity |
//! |------|------------|----------|
//! | Muddy low end | bass and low mids both over `high` (pop: both over `high × 1.15`), or both over `high × 1.10` | warning |
//! | Excessive bass | bass > `high × 1.3` | warning |
//! | Harsh upper mids | upper mids > `high × 1.1` | warning |
//! | Weak low end | bass < `low` | warning for hiphop/electronic/pop, else info |
//! | Weak sub | hiphop/electronic only, sub bass < 80 | info |
//! | Needs air | electronic only, brilliance < `low` | info |
//! | Uneven balance | band variance > 4200 (hiphop) / 3500 | info |
//! | Heavily compressed | crest < `over_compressed` | warning |
//! | Very dynamic | crest > `very_dynamic × 1.3` | info |
//!
//! When nothing fires, a single success insight praises the mix.

use super::bands::{BandEnergies, FrequencyBand};
use super::dynamics::DynamicsReading;
use super::profile::GenreProfile;
use crate::genre::Genre;
use serde::Serialize;

/// Absolute sub-bass floor for sub-heavy genres (not genre-scaled)
const SUB_BASS_FLOOR: f64 = 80.0;

const VARIANCE_LIMIT_HIPHOP: f64 = 4200.0;
const VARIANCE_LIMIT: f64 = 3500.0;

/// Severity ordering is warning < info < success (most urgent first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
    Success,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Success => "success",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule produced an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    MuddyLowEnd,
    ExcessiveBass,
    HarshUpperMids,
    WeakLowEnd,
    WeakSubBass,
    NeedsAir,
    UnevenBalance,
    HeavilyCompressed,
    VeryDynamic,
    SoundsGreat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub severity: Severity,
    pub kind: InsightKind,
    pub category: &'static str,
    pub title: &'static str,
    pub description: String,
    pub remedy: String,
}

impl Insight {
    fn new(
        severity: Severity,
        kind: InsightKind,
        category: &'static str,
        title: &'static str,
        description: impl Into<String>,
        remedy: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            category,
            title,
            description: description.into(),
            remedy: remedy.into(),
        }
    }
}

fn genre_context(genre: Genre) -> &'static str {
    match genre {
        Genre::HipHop => "in hip-hop",
        Genre::Rock => "in rock music",
        Genre::Electronic => "in electronic music",
        Genre::Jazz => "in jazz",
        Genre::Pop => "in pop music",
        Genre::General | Genre::Rnb => "generally",
    }
}

/// Evaluate the frequency-balance rules
pub fn frequency_insights(bands: &BandEnergies, genre: Genre) -> Vec<Insight> {
    let profile = GenreProfile::for_genre(genre);
    let mut insights = Vec::new();

    let bass = bands.get(FrequencyBand::Bass);
    let low_mids = bands.get(FrequencyBand::LowMids);
    let upper_mids = bands.get(FrequencyBand::UpperMids);
    let sub_bass = bands.get(FrequencyBand::SubBass);
    let brilliance = bands.get(FrequencyBand::Brilliance);

    // Muddy low end
    let is_pop = genre == Genre::Pop;
    let muddy_factor = if is_pop { 1.15 } else { 1.1 };
    let severe_overage =
        bass > profile.bass.high * muddy_factor && low_mids > profile.low_mids.high * muddy_factor;
    let both_over = bass > profile.bass.high && low_mids > profile.low_mids.high;

    if severe_overage || (!is_pop && both_over) {
        insights.push(Insight::new(
            Severity::Warning,
            InsightKind::MuddyLowEnd,
            "Bass",
            "Muddy Low End Detected",
            format!(
                "Your low end is getting muddy with buildup in both bass and low-mid frequencies. \
                 While {} can handle some weight, this is affecting clarity.",
                genre_context(genre)
            ),
            match genre {
                Genre::HipHop => {
                    "Try a gentle 1-2dB cut around 200-250Hz. Keep the sub-bass (30-60Hz) strong \
                     but clean up the low-mids. Consider high-passing melodic elements at 100Hz."
                }
                Genre::Pop => {
                    "Try a subtle 1-2dB cut around 150-200Hz. Modern pop can be full-sounding, \
                     but this might be a bit much. Consider gentle high-passing on non-bass elements."
                }
                _ => {
                    "Cut around 200-300Hz by 2-3dB with a wide Q. High-pass filter non-bass \
                     instruments at 80-120Hz to create more space."
                }
            },
        ));
    }

    if bass > profile.bass.high * 1.3 {
        insights.push(Insight::new(
            Severity::Warning,
            InsightKind::ExcessiveBass,
            "Bass",
            "Excessive Bass Energy",
            "Your bass is hitting extremely hard and might be distorting or overpowering other \
             elements. This level of bass energy can cause problems on most playback systems.",
            if genre == Genre::HipHop {
                "Pull back the bass/808 level by 2-4dB. Check for distortion and consider using a \
                 limiter on the bass bus. Make sure it's not clipping."
            } else {
                "Reduce bass levels by 3-5dB. Check your low-end instruments for clipping or \
                 distortion. Consider using a multiband compressor."
            },
        ));
    }

    if upper_mids > profile.upper_mids.high * 1.1 {
        let vocal_genre = matches!(genre, Genre::HipHop | Genre::Pop);
        insights.push(Insight::new(
            Severity::Warning,
            InsightKind::HarshUpperMids,
            "Mids",
            "Harsh Upper Mids",
            format!(
                "The 2-4kHz range is quite hot and potentially harsh. {}",
                if vocal_genre {
                    "This might be from pushed vocals, but it's getting aggressive."
                } else {
                    "This harshness might cause listening fatigue."
                }
            ),
            if vocal_genre {
                "Try a 1-2dB cut around 2.5-3kHz. Consider using a dynamic EQ so it only cuts when needed."
            } else {
                "Cut around 2.5-3.5kHz by 2-3dB. Use a moderate Q (around 1.5) for smooth results."
            },
        ));
    }

    if bass < profile.bass.low {
        let needs_bass = matches!(genre, Genre::HipHop | Genre::Electronic | Genre::Pop);
        insights.push(Insight::new(
            if needs_bass {
                Severity::Warning
            } else {
                Severity::Info
            },
            InsightKind::WeakLowEnd,
            "Bass",
            "Weak Low End",
            format!(
                "Your bass presence is quite light. {}",
                if needs_bass {
                    "This genre typically benefits from more substantial low-end foundation."
                } else {
                    "This might be intentional, but consider if you need more weight."
                }
            ),
            if genre == Genre::HipHop {
                "Boost around 50-80Hz by 2-4dB for more weight. Consider layering a sub-bass. \
                 Mono your sub frequencies below 80Hz."
            } else {
                "Try a gentle 2-3dB boost around 60-100Hz. Check the relationship between your \
                 bass and kick drum."
            },
        ));
    }

    if matches!(genre, Genre::HipHop | Genre::Electronic) && sub_bass < SUB_BASS_FLOOR {
        insights.push(Insight::new(
            Severity::Info,
            InsightKind::WeakSubBass,
            "Bass",
            "Could Use More Sub",
            "Your sub-bass (20-60Hz) presence is light. This frequency range adds weight and \
             impact that listeners feel more than hear.",
            "Consider boosting 30-50Hz by 1-3dB, or layer a dedicated sub-bass. Make sure it \
             translates well on smaller speakers too.",
        ));
    }

    if genre == Genre::Electronic && brilliance < profile.brilliance.low {
        insights.push(Insight::new(
            Severity::Info,
            InsightKind::NeedsAir,
            "Highs",
            "Could Use More Air",
            "Electronic music often benefits from bright, exciting highs. Your track could use \
             more sparkle and presence in the upper frequencies.",
            "Try a 1-2dB high shelf boost at 8-10kHz. Consider adding stereo width to your highs \
             with a mid-side EQ.",
        ));
    }

    let variance_limit = if genre == Genre::HipHop {
        VARIANCE_LIMIT_HIPHOP
    } else {
        VARIANCE_LIMIT
    };
    if bands.variance() > variance_limit {
        insights.push(Insight::new(
            Severity::Info,
            InsightKind::UnevenBalance,
            "Balance",
            "Uneven Frequency Balance",
            format!(
                "Your mix has some notable peaks and valleys across the frequency spectrum. {}",
                if genre == Genre::HipHop {
                    "Some character is normal in hip-hop, but this might be worth checking."
                } else {
                    "This could affect how balanced your mix sounds."
                }
            ),
            "Consider gentle EQ adjustments to smooth out the biggest differences. Small 1-2dB \
             moves usually work better than large cuts.",
        ));
    }

    insights
}

/// Evaluate the dynamic-range rules
pub fn dynamics_insights(dynamics: &DynamicsReading, genre: Genre) -> Vec<Insight> {
    let crest = GenreProfile::for_genre(genre).crest_factor;
    let mut insights = Vec::new();

    if dynamics.crest_factor < crest.over_compressed {
        let genre_note = match genre {
            Genre::HipHop => "Even for modern hip-hop standards, this is quite heavily compressed.",
            Genre::Pop => "This is quite compressed even for commercial pop music.",
            _ => "This level of compression might cause listener fatigue.",
        };
        insights.push(Insight::new(
            Severity::Warning,
            InsightKind::HeavilyCompressed,
            "Dynamics",
            "Heavily Compressed",
            format!(
                "Your mix is quite heavily compressed with very little dynamic range. {}",
                genre_note
            ),
            match genre {
                Genre::HipHop => {
                    "Try reducing the master limiter by 1-2dB. Modern hip-hop is loud but still \
                     needs some punch. Target around -8 to -6 LUFS."
                }
                Genre::Pop => {
                    "Consider backing off the master chain compression slightly. Aim for -9 to -7 \
                     LUFS for streaming platforms."
                }
                _ => {
                    "Ease up on your master bus processing. Try raising compressor thresholds or \
                     reducing limiter gain."
                }
            },
        ));
    }

    if dynamics.crest_factor > crest.very_dynamic * 1.3 {
        let jazz = genre == Genre::Jazz;
        insights.push(Insight::new(
            Severity::Info,
            InsightKind::VeryDynamic,
            "Dynamics",
            "Very Wide Dynamic Range",
            format!(
                "Your mix has a very wide dynamic range. {}",
                if jazz {
                    "This natural dynamic range is often perfect for jazz."
                } else {
                    "This might make quiet sections hard to hear in typical listening environments."
                }
            ),
            if jazz {
                "This dynamic range is often ideal for jazz. Just ensure the quietest parts are \
                 still audible in your target listening environment."
            } else {
                "Consider some gentle bus compression with a low ratio (2:1 or 3:1) to bring the \
                 dynamic range into a more manageable range."
            },
        ));
    }

    insights
}

fn praise(genre: Genre) -> Insight {
    let description = match genre {
        Genre::HipHop => {
            "The low end is hitting nicely, vocals have good presence, and the dynamics work well \
             for the genre!"
        }
        Genre::Rock => {
            "Good balance between instruments, appropriate dynamics, and clear frequency separation!"
        }
        Genre::Electronic => {
            "Clean low end, exciting highs, and good energy throughout the frequency spectrum!"
        }
        Genre::Jazz => "Natural dynamics, warm tonal balance, and excellent instrument separation!",
        Genre::Pop => "Polished sound with good vocal presence and commercial-ready balance!",
        Genre::General | Genre::Rnb => {
            "Great frequency balance and appropriate dynamics for your style!"
        }
    };

    Insight::new(
        Severity::Success,
        InsightKind::SoundsGreat,
        "Overall",
        "Mix Sounds Great!",
        description,
        "Your mix is in good shape! Consider A/B testing with professional references in your \
         genre for final polish.",
    )
}

/// Run every rule against measured bands and dynamics.
///
/// Frequency insights come first, then dynamics. If none fire, the result
/// is exactly one success insight.
pub fn evaluate(bands: &BandEnergies, dynamics: &DynamicsReading, genre: Genre) -> Vec<Insight> {
    let mut insights = frequency_insights(bands, genre);
    insights.extend(dynamics_insights(dynamics, genre));

    if insights.is_empty() {
        insights.push(praise(genre));
    }

    insights
}

/// The `max_count` most urgent insights.
///
/// Stable sort by severity, so insights of equal severity keep their
/// original relative order.
pub fn priority_insights(insights: &[Insight], max_count: usize) -> Vec<Insight> {
    let mut sorted = insights.to_vec();
    sorted.sort_by_key(|i| i.severity);
    sorted.truncate(max_count);
    sorted
}
