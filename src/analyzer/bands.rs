//! Frequency band energy aggregation
//!
//! A spectrum snapshot is a row of 0-255 magnitudes, one per bin, covering
//! 0 Hz to Nyquist. Each band maps to an inclusive bin range
//!
//! ```text
//! start = floor(min_hz / bin_width)
//! end   = floor(max_hz / bin_width)      (clipped to the last bin)
//! ```
//!
//! and its energy is the average magnitude over that range. Adjacent bands
//! share their boundary bin.

use crate::signal::hz_to_bin;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FrequencyBand {
    SubBass,
    Bass,
    LowMids,
    Mids,
    UpperMids,
    Presence,
    Brilliance,
}

impl FrequencyBand {
    pub const ALL: [FrequencyBand; 7] = [
        FrequencyBand::SubBass,
        FrequencyBand::Bass,
        FrequencyBand::LowMids,
        FrequencyBand::Mids,
        FrequencyBand::UpperMids,
        FrequencyBand::Presence,
        FrequencyBand::Brilliance,
    ];

    /// `(min_hz, max_hz)`
    pub fn range_hz(&self) -> (f64, f64) {
        match self {
            FrequencyBand::SubBass => (20.0, 60.0),
            FrequencyBand::Bass => (60.0, 250.0),
            FrequencyBand::LowMids => (250.0, 500.0),
            FrequencyBand::Mids => (500.0, 2000.0),
            FrequencyBand::UpperMids => (2000.0, 4000.0),
            FrequencyBand::Presence => (4000.0, 6000.0),
            FrequencyBand::Brilliance => (6000.0, 20000.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrequencyBand::SubBass => "Sub Bass",
            FrequencyBand::Bass => "Bass",
            FrequencyBand::LowMids => "Low Mids",
            FrequencyBand::Mids => "Mids",
            FrequencyBand::UpperMids => "Upper Mids",
            FrequencyBand::Presence => "Presence",
            FrequencyBand::Brilliance => "Brilliance",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Average magnitude per band, on the snapshot's 0-255 scale
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandEnergies([f64; 7]);

impl BandEnergies {
    pub fn new(values: [f64; 7]) -> Self {
        Self(values)
    }

    pub fn get(&self, band: FrequencyBand) -> f64 {
        self.0[band.index()]
    }

    pub fn set(&mut self, band: FrequencyBand, energy: f64) {
        self.0[band.index()] = energy;
    }

    /// Builder-style setter, handy for synthetic vectors
    pub fn with(mut self, band: FrequencyBand, energy: f64) -> Self {
        self.set(band, energy);
        self
    }

    pub fn values(&self) -> &[f64; 7] {
        &self.0
    }

    pub fn mean(&self) -> f64 {
        self.0.iter().sum::<f64>() / self.0.len() as f64
    }

    /// Population variance across the seven bands
    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.0.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / self.0.len() as f64
    }

    /// Measure band energies from a spectrum snapshot.
    ///
    /// An empty snapshot or a non-finite / non-positive sample rate gives
    /// all-zero energies.
    pub fn measure(frequency_data: &[u8], sample_rate: f64) -> Self {
        let mut energies = Self::default();
        let bin_count = frequency_data.len();

        for band in FrequencyBand::ALL {
            let (min_hz, max_hz) = band.range_hz();
            let (Some(start), Some(end)) = (
                hz_to_bin(min_hz, sample_rate, bin_count),
                hz_to_bin(max_hz, sample_rate, bin_count),
            ) else {
                continue;
            };

            let end = end.min(bin_count.saturating_sub(1));
            if start > end {
                continue;
            }

            let bins = &frequency_data[start..=end];
            let total: f64 = bins.iter().map(|&m| m as f64).sum();
            energies.set(band, total / bins.len() as f64);
        }

        energies
    }
}

impl Serialize for BandEnergies {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("BandEnergies", 7)?;
        s.serialize_field("subBass", &self.get(FrequencyBand::SubBass))?;
        s.serialize_field("bass", &self.get(FrequencyBand::Bass))?;
        s.serialize_field("lowMids", &self.get(FrequencyBand::LowMids))?;
        s.serialize_field("mids", &self.get(FrequencyBand::Mids))?;
        s.serialize_field("upperMids", &self.get(FrequencyBand::UpperMids))?;
        s.serialize_field("presence", &self.get(FrequencyBand::Presence))?;
        s.serialize_field("brilliance", &self.get(FrequencyBand::Brilliance))?;
        s.end()
    }
}
