//! Sample sources for the telemetry agent.
//!
//! Sources deliver frame timestamps and location fixes; ingestion workers
//! move them from a bounded channel into the analyzers. Synthetic and
//! recorded sources cover running without camera or GNSS hardware.

pub mod replay;
pub mod simulated;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use replay::{first_monotonic_ns, load_recording, replay, ReplayError, ReplaySummary};
pub use simulated::{CameraProfile, GnssProfile, SimulatedSource};
pub use types::{FrameEvent, LocationFix, SourceEvent};
pub use worker::{IngestHandle, IngestSink, IngestWorker, SourceError};
