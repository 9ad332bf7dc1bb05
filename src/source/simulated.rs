//! Synthetic camera and GNSS sources.
//!
//! These stand in for platform callbacks when no hardware is attached. Each
//! source runs on its own thread and pushes events into an ingestion handle
//! with `offer`, like a camera callback that must never block.

use crate::core::clock::{MonotonicClock, ProcessClock};
use crate::source::types::{FrameEvent, LocationFix};
use crate::source::worker::{IngestHandle, SourceError};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Synthetic camera settings.
#[derive(Debug, Clone, Copy)]
pub struct CameraProfile {
    pub target_fps: f64,
    /// Peak frame-interval deviation as a fraction of the nominal interval
    pub jitter_fraction: f64,
}

impl CameraProfile {
    /// Nominal interval plus a deterministic jitter term for frame `index`.
    pub fn interval_ns(&self, index: u64) -> i64 {
        let nominal = 1_000_000_000.0 / self.target_fps.max(0.1);
        // Two incommensurate tones, so the pattern does not repeat quickly.
        let phase = index as f64;
        let wobble = 0.7 * (phase * 0.37).sin() + 0.3 * (phase * 1.91).sin();
        let jitter = nominal * self.jitter_fraction.clamp(0.0, 0.9) * wobble;
        (nominal + jitter).max(1.0) as i64
    }
}

/// Synthetic GNSS receiver settings.
#[derive(Debug, Clone, Copy)]
pub struct GnssProfile {
    /// How fast the system clock runs away from GNSS time, parts per million
    pub drift_ppm: f64,
    pub fix_interval: Duration,
}

impl GnssProfile {
    /// Drift in milliseconds after `elapsed_ns` of monotonic time.
    pub fn drift_ms_after(&self, elapsed_ns: i64) -> f64 {
        elapsed_ns as f64 / 1_000_000.0 * self.drift_ppm / 1_000_000.0
    }
}

/// A running synthetic source thread.
pub struct SimulatedSource {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    /// Start a camera emitting frames on the process clock.
    pub fn camera(
        profile: CameraProfile,
        handle: IngestHandle<FrameEvent>,
    ) -> Result<Self, SourceError> {
        Self::spawn("sim-camera", move |running| {
            let mut index = 0u64;
            while running.load(Ordering::SeqCst) {
                let interval = profile.interval_ns(index);
                thread::sleep(Duration::from_nanos(interval as u64));
                match handle.offer(FrameEvent::new(ProcessClock.now_ns())) {
                    Ok(()) | Err(SourceError::Backpressure) => {}
                    Err(e) => {
                        tracing::warn!("Simulated camera stopping: {e}");
                        break;
                    }
                }
                index += 1;
            }
        })
    }

    /// Start a GNSS receiver whose fixes lead the system clock by a growing drift.
    pub fn gnss(
        profile: GnssProfile,
        handle: IngestHandle<LocationFix>,
    ) -> Result<Self, SourceError> {
        Self::spawn("sim-gnss", move |running| {
            let origin = ProcessClock.now_ns();
            while running.load(Ordering::SeqCst) {
                thread::sleep(profile.fix_interval);
                let receipt = ProcessClock.now_ns();
                let system_ms = Utc::now().timestamp_millis();
                let drift = profile.drift_ms_after(receipt - origin).round() as i64;
                let fix = LocationFix {
                    gps_epoch_ms: system_ms + drift,
                    monotonic_receipt_ns: receipt,
                    system_epoch_ms: system_ms,
                };
                if let Err(e) = handle.offer(fix) {
                    if e == SourceError::Disconnected {
                        tracing::warn!("Simulated GNSS stopping: {e}");
                        break;
                    }
                }
            }
        })
    }

    fn spawn<F>(name: &str, body: F) -> Result<Self, SourceError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))
            .map_err(|_| SourceError::SpawnFailed)?;
        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the source and wait for its thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Simulated source thread panicked");
            }
        }
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.stop();
    }
}
