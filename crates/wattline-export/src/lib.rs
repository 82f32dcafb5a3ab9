//! ---
//! wl_section: "09-export-reporting"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "CSV export and import of the visible sample window."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
//! Delimited-text export of the current window: one header row carrying the
//! sample field names, one row per sample, every value quoted. Purely a
//! formatting concern; the engine never depends on this crate.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use wattline_common::DeviceSample;

/// Default file name for window exports.
pub const DEFAULT_EXPORT_NAME: &str = "visible-window.csv";

/// Write `samples` as CSV. The header row is derived from the sample field
/// names; an empty window produces an empty export.
pub fn export_window<W: Write>(samples: &[DeviceSample], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new()
        .has_headers(true)
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    for sample in samples {
        csv_writer
            .serialize(sample)
            .with_context(|| "failed to serialise sample row")?;
    }
    csv_writer
        .flush()
        .with_context(|| "failed to flush csv output")?;
    Ok(())
}

/// Write `samples` as CSV to a file path.
pub fn export_window_to_path<P: AsRef<Path>>(samples: &[DeviceSample], path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("unable to create export file {}", path.display()))?;
    export_window(samples, file)
}

/// Re-parse a previous export. Every field value round-trips; numeric text
/// formatting is the only representation that may differ.
pub fn import_window<R: Read>(reader: R) -> Result<Vec<DeviceSample>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut samples = Vec::new();
    for row in csv_reader.deserialize::<DeviceSample>() {
        samples.push(row.with_context(|| "invalid sample row in export")?);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use wattline_common::DeviceState;

    fn sample(minute: i64) -> DeviceSample {
        DeviceSample {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minute),
            state: DeviceState::Run,
            kw: 12.5,
            kwh_total: 1040.25,
            pf: Some(0.93),
            count_total: 812.0,
            ir: 18.2,
            iy: 17.9,
            ib: 18.0,
            vr: 231.4,
            vy: 229.8,
            vb: 230.1,
            alarm_code: None,
        }
    }

    #[test]
    fn export_emits_header_and_quoted_values() {
        let mut out = Vec::new();
        export_window(&[sample(0)], &mut out).expect("export succeeds");
        let text = String::from_utf8(out).expect("utf8 output");
        let mut lines = text.lines();
        let header = lines.next().expect("header row present");
        assert!(header.starts_with("\"timestamp\",\"state\",\"kw\""));
        assert!(header.ends_with("\"alarm_code\""));
        let row = lines.next().expect("data row present");
        assert!(row.contains("\"RUN\""));
        assert!(row.contains("\"12.5\""));
    }

    #[test]
    fn round_trip_reproduces_every_field() {
        let mut a = sample(0);
        a.alarm_code = Some("E-17".to_owned());
        let mut b = sample(1);
        b.state = DeviceState::Off;
        b.pf = None;
        b.kw = 0.0;
        let window = vec![a, b];

        let mut out = Vec::new();
        export_window(&window, &mut out).expect("export succeeds");
        let parsed = import_window(out.as_slice()).expect("import succeeds");
        assert_eq!(parsed, window);
    }

    #[test]
    fn empty_window_round_trips_to_empty() {
        let mut out = Vec::new();
        export_window(&[], &mut out).expect("export succeeds");
        let parsed = import_window(out.as_slice()).expect("import succeeds");
        assert!(parsed.is_empty());
    }
}
