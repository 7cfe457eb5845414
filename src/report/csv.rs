//! CSV report, one row per insight
//!
//! Band energies and crest factor repeat on every row of a snapshot so each
//! row stands alone in a spreadsheet filter.

use super::ReportEntry;
use crate::analyzer::FrequencyBand;
use std::io::{self, Write};

const HEADER: &str = "file,time_secs,genre,sub_bass,bass,low_mids,mids,upper_mids,presence,brilliance,crest_factor,severity,kind,title,description,remedy";

pub fn write<W: Write>(writer: &mut W, entries: &[ReportEntry]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)?;

    for entry in entries {
        let analysis = &entry.analysis;
        let bands: Vec<String> = FrequencyBand::ALL
            .iter()
            .map(|&band| format!("{:.1}", analysis.bands.get(band)))
            .collect();

        for insight in &analysis.insights {
            writeln!(
                writer,
                "{},{:.2},{},{},{:.2},{},{},{},{},{}",
                escape(&entry.file_name),
                entry.time_secs,
                analysis.genre,
                bands.join(","),
                analysis.dynamics.crest_factor,
                insight.severity,
                escape(&format!("{:?}", insight.kind)),
                escape(insight.title),
                escape(&insight.description),
                escape(&insight.remedy),
            )?;
        }
    }

    writer.flush()
}

/// Quote a field if it contains a delimiter, quote or newline
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::{entry, OPTIMAL};

    fn render(entries: &[ReportEntry]) -> String {
        let mut out = Vec::new();
        write(&mut out, entries).unwrap();
        String::from_utf8(out).unwrap()
    }

    // ==========================================================================
    // ESCAPING
    // ==========================================================================

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("two\nlines"), "\"two\nlines\"");
    }

    // ==========================================================================
    // ROWS
    // ==========================================================================

    #[test]
    fn test_one_row_per_insight() {
        let csv = render(&[entry(3.0, OPTIMAL, 10.0), entry(6.0, [0.0; 7], 0.0)]);
        let lines: Vec<&str> = csv.lines().collect();

        // header + praise + weak low end + heavily compressed
        assert_eq!(lines.len(), 4, "unexpected CSV:\n{}", csv);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("mix.wav,3.00,general,130.0,150.0,130.0,120.0,120.0,100.0,70.0,10.00,success,SoundsGreat,"));
        assert!(lines[2].contains(",info,WeakLowEnd,"));
        assert!(lines[3].contains(",warning,HeavilyCompressed,"));
    }

    #[test]
    fn test_empty_report_is_header_only() {
        assert_eq!(render(&[]), format!("{}\n", HEADER));
    }
}
