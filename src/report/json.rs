//! JSON report
//!
//! ```text
//! {
//!   "generator": "fixmymix 0.3.0",
//!   "generated_at": "2026-01-01T12:00:00+00:00",
//!   "summary": { "snapshots": 2, "warnings": 1, "info": 0, "success": 1 },
//!   "snapshots": [ { "file_name", "time_secs", "analysis": {...} }, ... ]
//! }
//! ```

use super::{ReportEntry, Summary};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Document<'a> {
    generator: String,
    generated_at: String,
    summary: Summary,
    snapshots: &'a [ReportEntry],
}

pub fn write<W: Write>(writer: &mut W, entries: &[ReportEntry]) -> io::Result<()> {
    let document = Document {
        generator: format!("fixmymix {}", env!("CARGO_PKG_VERSION")),
        generated_at: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_entries(entries),
        snapshots: entries,
    };

    serde_json::to_writer_pretty(&mut *writer, &document).map_err(io::Error::from)?;
    writeln!(writer)?;
    writer.flush()
}
