//! Core functionality for the telemetry agent.
//!
//! This module contains:
//! - The bounded timestamped series both analyzers store samples in
//! - Frame timing statistics over trailing windows
//! - GNSS clock drift tracking and drift-rate estimation
//! - Report building for the polling side

pub mod clock;
pub mod drift;
pub mod fps;
pub mod lifecycle;
pub mod report;
pub mod series;

// Re-export commonly used types
pub use clock::{ManualClock, MonotonicClock, ProcessClock};
pub use drift::{ClockDriftTracker, DriftPoint, DriftRate, DriftWindow, DRIFT_RETENTION};
pub use fps::{FpsStats, FpsWindow, FrameIntervals, FrameTimingAnalyzer, WindowStats, FRAME_RETENTION};
pub use lifecycle::{IngestError, LifecycleError, LifecycleState};
pub use report::{ReportBuilder, TelemetryReport, PRODUCER_NAME};
pub use series::{BoundedSeries, Sample, SeriesError};
