//! ---
//! wl_section: "02-stream-acquisition"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Sample acquisition, playback, and synthetic generation."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use wattline_common::DeviceSample;

use crate::StreamError;

/// Replay source over a newline-delimited JSON sample file.
///
/// The line list is read up front (an unreadable path is an acquisition
/// error); individual lines are parsed lazily, one per delivery. Malformed
/// lines are skipped with a logged warning and counted, never escalated. The
/// source yields samples in file order and stops at the end; it does not
/// cycle.
#[derive(Debug)]
pub struct JsonlSource {
    path: PathBuf,
    lines: Vec<String>,
    cursor: usize,
    skipped: u64,
}

impl JsonlSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StreamError> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|source| StreamError::Acquisition {
            path: path.clone(),
            source,
        })?;
        let lines = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(Self {
            path,
            lines,
            cursor: 0,
            skipped: 0,
        })
    }

    /// Next parseable sample, or `None` at end of stream.
    pub fn next_sample(&mut self) -> Option<DeviceSample> {
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            self.cursor += 1;
            match serde_json::from_str::<DeviceSample>(line) {
                Ok(sample) => return Some(sample),
                Err(err) => {
                    self.skipped += 1;
                    warn!(
                        path = %self.path.display(),
                        line = self.cursor,
                        error = %err,
                        "skipping malformed sample line"
                    );
                }
            }
        }
        None
    }

    /// Lines not yet delivered or skipped.
    pub fn remaining(&self) -> usize {
        self.lines.len() - self.cursor
    }

    /// Count of malformed lines discarded so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for JsonlSource {
    type Item = DeviceSample;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wattline_common::DeviceState;

    const GOOD_LINE: &str = r#"{"timestamp":"2024-03-01T08:00:00Z","state":"RUN","kw":12.4,"kwh_total":1043.2,"pf":0.92,"count_total":5312,"ir":18.1,"iy":18.4,"ib":17.9,"vr":231.0,"vy":229.5,"vb":230.2,"alarm_code":null}"#;

    #[test]
    fn yields_samples_in_file_order_and_stops_at_eof() {
        let mut file = NamedTempFile::new().expect("temp stream file");
        writeln!(file, "{}", GOOD_LINE).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", GOOD_LINE.replace("\"RUN\"", "\"IDLE\"")).unwrap();
        file.flush().unwrap();

        let mut source = JsonlSource::open(file.path()).expect("source opens");
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_sample().unwrap().state, DeviceState::Run);
        assert_eq!(source.next_sample().unwrap().state, DeviceState::Idle);
        assert!(source.next_sample().is_none());
        assert_eq!(source.skipped(), 0);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let mut file = NamedTempFile::new().expect("temp stream file");
        writeln!(file, "not json at all").unwrap();
        writeln!(file, "{}", GOOD_LINE).unwrap();
        writeln!(file, "{{\"timestamp\": \"broken\"}}").unwrap();
        file.flush().unwrap();

        let mut source = JsonlSource::open(file.path()).expect("source opens");
        assert!(source.next_sample().is_some());
        assert!(source.next_sample().is_none());
        assert_eq!(source.skipped(), 2);
    }

    #[test]
    fn unreadable_path_is_an_acquisition_error() {
        let err = JsonlSource::open("definitely/not/here.jsonl").expect_err("missing file");
        assert!(matches!(err, StreamError::Acquisition { .. }));
        assert!(err.to_string().contains("not/here.jsonl"));
    }
}
