//! Genre tags shared by the analyzer and the mixer
//!
//! The analyzer knows six genres (general, hiphop, pop, rock, electronic,
//! jazz) and the mixer knows six (general, hiphop, pop, rock, electronic,
//! rnb). One enum covers both; each side falls back to `General` for the
//! genre it has no table for.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    #[default]
    General,
    HipHop,
    Pop,
    Rock,
    Electronic,
    Jazz,
    Rnb,
}

impl Genre {
    pub const ALL: [Genre; 7] = [
        Genre::General,
        Genre::HipHop,
        Genre::Pop,
        Genre::Rock,
        Genre::Electronic,
        Genre::Jazz,
        Genre::Rnb,
    ];

    /// Genres the analyzer has its own threshold profile for.
    pub const ANALYZER: [Genre; 6] = [
        Genre::General,
        Genre::HipHop,
        Genre::Pop,
        Genre::Rock,
        Genre::Electronic,
        Genre::Jazz,
    ];

    /// Genres the mixer has its own parameter set for.
    pub const MIXER: [Genre; 6] = [
        Genre::General,
        Genre::HipHop,
        Genre::Pop,
        Genre::Rock,
        Genre::Electronic,
        Genre::Rnb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::General => "general",
            Genre::HipHop => "hiphop",
            Genre::Pop => "pop",
            Genre::Rock => "rock",
            Genre::Electronic => "electronic",
            Genre::Jazz => "jazz",
            Genre::Rnb => "rnb",
        }
    }

    /// Parse a tag, falling back to `General` for anything unknown.
    pub fn parse_or_general(tag: &str) -> Genre {
        tag.parse().unwrap_or_default()
    }

    pub(crate) fn to_index(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_index(index: u8) -> Genre {
        Genre::ALL
            .get(index as usize)
            .copied()
            .unwrap_or_default()
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGenre(pub String);

impl fmt::Display for UnknownGenre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown genre '{}' (expected general, hiphop, pop, rock, electronic, jazz or rnb)",
            self.0
        )
    }
}

impl std::error::Error for UnknownGenre {}

impl FromStr for Genre {
    type Err = UnknownGenre;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "auto" => Ok(Genre::General),
            "hiphop" | "hip-hop" | "hip_hop" | "trap" => Ok(Genre::HipHop),
            "pop" => Ok(Genre::Pop),
            "rock" => Ok(Genre::Rock),
            "electronic" | "edm" => Ok(Genre::Electronic),
            "jazz" => Ok(Genre::Jazz),
            "rnb" | "r&b" | "r-n-b" => Ok(Genre::Rnb),
            _ => Err(UnknownGenre(s.to_string())),
        }
    }
}
