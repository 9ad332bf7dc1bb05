//! Recorded source events.
//!
//! A recording is a JSON-lines file of [`SourceEvent`]s in arrival order.
//! Replaying pushes each event through the same ingestion handles a live
//! source would use.

use crate::source::types::{FrameEvent, LocationFix, SourceEvent};
use crate::source::worker::{IngestHandle, SourceError};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Errors reading or replaying a recording.
#[derive(Debug)]
pub enum ReplayError {
    IoError(String),
    /// A line that is not a valid event, with its 1-based line number
    Parse { line: usize, message: String },
    Source(SourceError),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::IoError(e) => write!(f, "IO error: {e}"),
            ReplayError::Parse { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
            ReplayError::Source(e) => write!(f, "Source error: {e}"),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<SourceError> for ReplayError {
    fn from(e: SourceError) -> Self {
        ReplayError::Source(e)
    }
}

/// Counts of replayed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub fixes: usize,
}

/// Parse a JSON-lines recording. Blank lines are skipped.
pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<SourceEvent>, ReplayError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ReplayError::IoError(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|e| ReplayError::Parse {
            line: index + 1,
            message: e.to_string(),
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Load a recording from disk.
pub fn load_recording(path: &Path) -> Result<Vec<SourceEvent>, ReplayError> {
    let file = std::fs::File::open(path).map_err(|e| ReplayError::IoError(e.to_string()))?;
    parse_recording(BufReader::new(file))
}

/// Write events as JSON lines.
pub fn write_recording<W: Write>(mut writer: W, events: &[SourceEvent]) -> Result<(), ReplayError> {
    for event in events {
        let line =
            serde_json::to_string(event).map_err(|e| ReplayError::IoError(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| ReplayError::IoError(e.to_string()))?;
    }
    Ok(())
}

/// Earliest monotonic time in a recording.
///
/// A tracker replaying the recording takes its start reference from here.
pub fn first_monotonic_ns(events: &[SourceEvent]) -> Option<i64> {
    events.iter().map(SourceEvent::monotonic_ns).min()
}

/// Push every event into its handle, blocking on full channels.
pub fn replay(
    events: &[SourceEvent],
    frames: &IngestHandle<FrameEvent>,
    fixes: &IngestHandle<LocationFix>,
) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();
    for event in events {
        match *event {
            SourceEvent::Frame(frame) => {
                frames.send(frame)?;
                summary.frames += 1;
            }
            SourceEvent::Fix(fix) => {
                fixes.send(fix)?;
                summary.fixes += 1;
            }
        }
    }
    tracing::debug!(
        frames = summary.frames,
        fixes = summary.fixes,
        "Recording replayed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_skips_blank_lines() {
        let input = "{\"kind\":\"frame\",\"timestamp_ns\":10}\n\n{\"kind\":\"frame\",\"timestamp_ns\":20}\n";
        let events = parse_recording(Cursor::new(input)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(first_monotonic_ns(&events), Some(10));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let input = "{\"kind\":\"frame\",\"timestamp_ns\":10}\nnot json\n";
        match parse_recording(Cursor::new(input)) {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_write_then_parse() {
        let events = vec![
            SourceEvent::Frame(FrameEvent::new(5)),
            SourceEvent::Fix(LocationFix {
                gps_epoch_ms: 9,
                monotonic_receipt_ns: 3,
                system_epoch_ms: 8,
            }),
        ];
        let mut buffer = Vec::new();
        write_recording(&mut buffer, &events).unwrap();
        let parsed = parse_recording(Cursor::new(buffer)).unwrap();
        assert_eq!(parsed, events);
        assert_eq!(first_monotonic_ns(&parsed), Some(3));
    }
}
