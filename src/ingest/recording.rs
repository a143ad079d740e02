//! Recorded measurement stream.
//!
//! One JSON object per line:
//!
//! ```text
//! {"frame_index": 0, "detection": {"ball": [0.5, 0.5, 0.1, 0.1]}}
//! {"frame_index": 0, "pose": {"l_ankle": [0.45, 0.7], "r_ankle": [0.0, 0.0]}}
//! ```
//!
//! Either half may be absent on a line, and both halves of a frame may share
//! a line. Blank lines and lines starting with `#` are skipped.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::sample::{DetectionHalf, Pose};

/// One line of a recording.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub frame_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionHalf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
}

impl MeasurementRecord {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| anyhow!("invalid measurement record: {}", e))
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingStats {
    pub records_read: u64,
    pub lines_skipped: u64,
}

/// Reads `MeasurementRecord`s from a local JSON-lines recording.
pub struct RecordingSource<R> {
    reader: R,
    line_number: u64,
    stats: RecordingStats,
    buf: String,
}

impl RecordingSource<BufReader<File>> {
    /// Open a local recording. URL-like paths are refused.
    pub fn open(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        if !is_local_file_path(&display) {
            return Err(anyhow!(
                "recordings are read from local paths only (no URL schemes)"
            ));
        }
        let file = File::open(path)
            .map_err(|e| anyhow!("failed to open recording {}: {}", display, e))?;
        log::info!("RecordingSource: reading {}", display);
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordingSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            stats: RecordingStats::default(),
            buf: String::new(),
        }
    }

    /// Next record, or `None` at end of input. Malformed lines are errors
    /// carrying their line number.
    pub fn next_record(&mut self) -> Result<Option<MeasurementRecord>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|e| anyhow!("failed to read recording: {}", e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                self.stats.lines_skipped += 1;
                continue;
            }
            let record = MeasurementRecord::parse(line)
                .map_err(|e| anyhow!("line {}: {}", self.line_number, e))?;
            self.stats.records_read += 1;
            return Ok(Some(record));
        }
    }

    pub fn stats(&self) -> &RecordingStats {
        &self.stats
    }
}

impl<R: BufRead> Iterator for RecordingSource<R> {
    type Item = Result<MeasurementRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn is_local_file_path(path: &str) -> bool {
    !path.trim().is_empty() && !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Limb;
    use std::io::Cursor;

    #[test]
    fn reads_split_and_combined_halves() {
        let input = r#"
# warm-up
{"frame_index": 0, "detection": {"ball": [0.5, 0.5, 0.1, 0.1]}}
{"frame_index": 0, "pose": {"l_ankle": [0.45, 0.7], "r_ankle": [0.0, 0.0]}}
{"frame_index": 1, "detection": {"ball": null}, "pose": {"l_ankle": {"x": 0.4, "y": 0.6}}}
"#;
        let mut source = RecordingSource::from_reader(Cursor::new(input));

        let first = source.next_record().unwrap().unwrap();
        assert!(first.detection.unwrap().ball.is_some());
        assert!(first.pose.is_none());

        let second = source.next_record().unwrap().unwrap();
        let pose = second.pose.unwrap();
        assert!(pose.ankle(Limb::Left).is_some());
        assert!(pose.ankle(Limb::Right).is_none());

        let third = source.next_record().unwrap().unwrap();
        assert_eq!(third.frame_index, 1);
        assert_eq!(third.detection, Some(DetectionHalf::missing()));

        assert!(source.next_record().unwrap().is_none());
        assert_eq!(source.stats().records_read, 3);
        assert_eq!(source.stats().lines_skipped, 2);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let input = "{\"frame_index\": 0}\n{\"frame_index\": \"zero\"}\n";
        let mut source = RecordingSource::from_reader(Cursor::new(input));
        assert!(source.next_record().unwrap().is_some());
        let err = source.next_record().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn url_paths_are_refused() {
        assert!(RecordingSource::open(Path::new("http://example.com/run.jsonl")).is_err());
    }
}
