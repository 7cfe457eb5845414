//! Report generation for timeline analyses
//!
//! Writes the snapshots taken across a file, and what the analyzer made of
//! each, in one of two formats:
//!
//! - **JSON**: the full readings (band energies, crest factor, insights)
//! - **CSV**: one row per insight, for spreadsheets
//!
//! # Usage
//!
//! ```ignore
//! use fixmymix::report;
//!
//! // Picks the format from the extension
//! report::generate("mix.json", &entries)?;  // JSON
//! report::generate("mix.csv", &entries)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::analyzer::{Analysis, Severity};
use serde::Serialize;
use std::io;
use std::path::Path;

/// One analyzed snapshot of one file
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub file_name: String,
    pub time_secs: f64,
    pub analysis: Analysis,
}

/// Generate a report in the format matching the file extension
pub fn generate<P: AsRef<Path>>(path: P, entries: &[ReportEntry]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = io::BufWriter::new(std::fs::File::create(path)?);

    match ext.as_str() {
        "json" => json::write(&mut file, entries),
        _ => csv::write(&mut file, entries),
    }
}

/// Insight counts across a batch of snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub snapshots: usize,
    pub warnings: usize,
    pub info: usize,
    pub success: usize,
}

impl Summary {
    pub fn from_entries(entries: &[ReportEntry]) -> Self {
        let mut summary = Self {
            snapshots: entries.len(),
            ..Self::default()
        };

        for entry in entries {
            summary.warnings += entry.analysis.count(Severity::Warning);
            summary.info += entry.analysis.count(Severity::Info);
            summary.success += entry.analysis.count(Severity::Success);
        }

        summary
    }

    /// Snapshots where nothing needed attention
    pub fn clean_ratio(&self, entries: &[ReportEntry]) -> f64 {
        if entries.is_empty() {
            return 0.0;
        }
        let clean = entries
            .iter()
            .filter(|e| e.analysis.count(Severity::Warning) == 0)
            .count();
        clean as f64 / entries.len() as f64
    }
}
