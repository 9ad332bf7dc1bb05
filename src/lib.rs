//! Phonestats Telemetry - rolling frame-timing and clock-drift statistics.
//!
//! This library reduces two device telemetry streams into rolling windowed
//! statistics that a presentation layer can poll about once per second:
//!
//! - **Frame timing**: camera frame-arrival timestamps become min/mean/max
//!   instantaneous frame rates over 10 s, 1 min, 5 min and 20 min windows.
//! - **Clock drift**: GNSS fixes become drift points (GNSS time minus system
//!   time) and drift-rate estimates over 1 min, 5 min, 20 min and the whole
//!   retained history.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Phonestats Telemetry                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│   Ingest    │──▶│  Analyzer   │       │
//! │  │ (frames/fix)│   │  (bounded)  │   │  (series)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           │                  │              │
//! │                           ▼                  ▼              │
//! │                    ┌─────────────┐   ┌─────────────┐       │
//! │                    │   Journal   │   │   Report    │       │
//! │                    │  (counts)   │   │   (poll)    │       │
//! │                    └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use phonestats_telemetry::core::{FrameTimingAnalyzer, FpsWindow};
//!
//! let analyzer = FrameTimingAnalyzer::new();
//! analyzer.start().expect("fresh analyzer");
//!
//! for i in 0..5 {
//!     analyzer.record(1_000_000_000 + i * 33_333_333).expect("running");
//! }
//!
//! let stats = analyzer.stats().expect("two or more frames");
//! let ten_sec = stats.window(FpsWindow::TenSeconds).expect("frames in window");
//! assert!((ten_sec.mean_fps - 30.0).abs() < 1e-6);
//! ```

pub mod config;
pub mod core;
pub mod journal;
pub mod source;

// Re-export key types at crate root for convenience
pub use config::{Config, SimulationConfig};
pub use core::{
    ClockDriftTracker, DriftPoint, DriftRate, DriftWindow, FpsStats, FpsWindow,
    FrameTimingAnalyzer, IngestError, ReportBuilder, TelemetryReport, WindowStats,
};
pub use journal::{IngestJournal, JournalStats, SharedJournal};
pub use source::{FrameEvent, IngestHandle, IngestWorker, LocationFix, SourceEvent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
