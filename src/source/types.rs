//! Messages delivered by the frame and location sources.

use serde::{Deserialize, Serialize};

/// One captured camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Monotonic capture time in nanoseconds
    pub timestamp_ns: i64,
}

impl FrameEvent {
    pub fn new(timestamp_ns: i64) -> Self {
        Self { timestamp_ns }
    }
}

/// One location fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFix {
    /// GNSS UTC time in epoch milliseconds; 0 when the fix has no time
    pub gps_epoch_ms: i64,
    /// Monotonic time the fix was determined
    pub monotonic_receipt_ns: i64,
    /// System wall clock at receipt, epoch milliseconds
    pub system_epoch_ms: i64,
}

impl LocationFix {
    pub fn has_time(&self) -> bool {
        self.gps_epoch_ms != 0
    }
}

/// Either kind of source message, as stored in recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceEvent {
    Frame(FrameEvent),
    Fix(LocationFix),
}

impl SourceEvent {
    /// Monotonic time of the event.
    pub fn monotonic_ns(&self) -> i64 {
        match self {
            SourceEvent::Frame(e) => e.timestamp_ns,
            SourceEvent::Fix(f) => f.monotonic_receipt_ns,
        }
    }
}
