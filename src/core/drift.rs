//! GNSS clock drift tracking.
//!
//! Each GNSS fix carries satellite-derived UTC time. Comparing it with the
//! system wall clock at receipt gives the drift of the system clock; the
//! tracker keeps 30 minutes of drift points and estimates the drift rate
//! over trailing windows.

use crate::core::clock::{MonotonicClock, ProcessClock};
use crate::core::lifecycle::{IngestError, Lifecycle, LifecycleError, LifecycleState};
use crate::core::series::{BoundedSeries, Sample};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// How long drift points are kept.
pub const DRIFT_RETENTION: Duration = Duration::from_secs(1800);

/// Spans shorter than this give no rate.
const MIN_RATE_SPAN_SECS: f64 = 1.0;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// One drift measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftPoint {
    /// Seconds since the tracker's start reference
    pub elapsed_seconds: f64,
    /// GNSS time minus system time, relative to the reference sample
    pub drift_ms: f64,
}

impl From<Sample<f64>> for DriftPoint {
    fn from(sample: Sample<f64>) -> Self {
        Self {
            elapsed_seconds: sample.timestamp as f64 / NANOS_PER_SEC,
            drift_ms: sample.value,
        }
    }
}

/// Drift rate over a span of drift points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftRate {
    pub drift_ms_per_minute: f64,
    /// Span actually covered, in seconds
    pub window_seconds: f64,
}

/// Windows polled by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftWindow {
    OneMinute,
    FiveMinutes,
    TwentyMinutes,
    /// Everything retained
    Total,
}

impl DriftWindow {
    pub const ALL: [DriftWindow; 4] = [
        DriftWindow::OneMinute,
        DriftWindow::FiveMinutes,
        DriftWindow::TwentyMinutes,
        DriftWindow::Total,
    ];

    pub fn seconds(self) -> f64 {
        match self {
            DriftWindow::OneMinute => 60.0,
            DriftWindow::FiveMinutes => 300.0,
            DriftWindow::TwentyMinutes => 1200.0,
            DriftWindow::Total => f64::MAX,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DriftWindow::OneMinute => "1m",
            DriftWindow::FiveMinutes => "5m",
            DriftWindow::TwentyMinutes => "20m",
            DriftWindow::Total => "total",
        }
    }
}

/// Estimate the drift rate from ordered drift points.
///
/// The start point is the oldest one inside `[latest - window, latest]`.
pub fn drift_rate_over(points: &[DriftPoint], window_seconds: f64) -> Option<DriftRate> {
    if points.len() < 2 {
        return None;
    }
    let last_index = points.len() - 1;
    let latest = points[last_index];
    let cutoff = latest.elapsed_seconds - window_seconds;

    let start_index = points.iter().position(|p| p.elapsed_seconds >= cutoff)?;
    if start_index == last_index {
        return None;
    }
    let start = points[start_index];

    let span = latest.elapsed_seconds - start.elapsed_seconds;
    if span < MIN_RATE_SPAN_SECS {
        return None;
    }

    Some(DriftRate {
        drift_ms_per_minute: (latest.drift_ms - start.drift_ms) / span * 60.0,
        window_seconds: span,
    })
}

/// Tracks system clock drift against GNSS time.
pub struct ClockDriftTracker {
    lifecycle: Lifecycle,
    clock: Arc<dyn MonotonicClock>,
    series: BoundedSeries<f64>,
    has_fix: AtomicBool,
    reference_monotonic_ns: AtomicI64,
    /// Drift stored for the reference sample; later samples are relative to it.
    /// Held for the whole session rather than re-read from the oldest retained
    /// point, so eviction never shifts the baseline.
    reference_drift_ms: Mutex<Option<f64>>,
}

impl std::fmt::Debug for ClockDriftTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockDriftTracker")
            .field("state", &self.lifecycle.state())
            .field("points", &self.series.len())
            .field("has_fix", &self.has_fix())
            .finish()
    }
}

impl ClockDriftTracker {
    /// Tracker on the process monotonic clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(ProcessClock))
    }

    /// Tracker whose start reference is read from `clock`.
    ///
    /// `clock` must run on the same timeline as the receipt times fed to
    /// [`ClockDriftTracker::ingest`].
    pub fn with_clock(clock: Arc<dyn MonotonicClock>) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            clock,
            series: BoundedSeries::new(DRIFT_RETENTION),
            has_fix: AtomicBool::new(false),
            reference_monotonic_ns: AtomicI64::new(0),
            reference_drift_ms: Mutex::new(None),
        }
    }

    /// Begin accepting fixes. A no-op when already running.
    ///
    /// The start reference is only taken while no drift points exist, so a
    /// restart after [`stop`](Self::stop) continues the same timeline.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let started = self.lifecycle.start_with(|| {
            if self.series.is_empty() {
                self.reference_monotonic_ns
                    .store(self.clock.now_ns(), Ordering::SeqCst);
            }
        })?;
        if started {
            tracing::debug!(
                reference_ns = self.reference_monotonic_ns.load(Ordering::SeqCst),
                "Clock drift tracker started"
            );
        }
        Ok(())
    }

    /// Stop accepting fixes, keeping the drift points.
    pub fn stop(&self) {
        if self.lifecycle.stop() {
            tracing::debug!(points = self.series.len(), "Clock drift tracker stopped");
        }
        self.has_fix.store(false, Ordering::SeqCst);
    }

    /// Stop for good and discard all drift points and references.
    pub fn release(&self) {
        self.lifecycle.release_with(|| {
            self.series.clear();
            self.has_fix.store(false, Ordering::SeqCst);
            self.reference_monotonic_ns.store(0, Ordering::SeqCst);
            *self.reference_drift() = None;
        });
        tracing::debug!("Clock drift tracker released");
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether a fix with GNSS time has been accepted since the last start.
    pub fn has_fix(&self) -> bool {
        self.has_fix.load(Ordering::SeqCst)
    }

    /// Ingest one fix.
    ///
    /// * `gps_epoch_ms` - GNSS UTC time, 0 when the fix carries no time
    /// * `monotonic_receipt_ns` - monotonic time the fix was determined
    /// * `system_epoch_ms` - system wall clock at receipt
    pub fn ingest(
        &self,
        gps_epoch_ms: i64,
        monotonic_receipt_ns: i64,
        system_epoch_ms: i64,
    ) -> Result<(), IngestError> {
        self.lifecycle.admit(|| {
            if gps_epoch_ms == 0 {
                return Err(IngestError::MissingTimestamp);
            }
            let elapsed_ns = monotonic_receipt_ns
                .saturating_sub(self.reference_monotonic_ns.load(Ordering::SeqCst));

            let mut reference = self.reference_drift();
            match *reference {
                None => {
                    self.series.append(elapsed_ns, 0.0)?;
                    *reference = Some(0.0);
                    tracing::debug!(elapsed_ns, "Drift reference sample recorded");
                }
                Some(reference_drift) => {
                    let raw_drift = gps_epoch_ms as f64 - system_epoch_ms as f64;
                    self.series.append(elapsed_ns, raw_drift - reference_drift)?;
                }
            }
            self.has_fix.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    /// Every retained drift point, oldest first.
    pub fn drift_series(&self) -> Vec<DriftPoint> {
        self.series.snapshot().into_iter().map(DriftPoint::from).collect()
    }

    /// Drift points no older than `range_seconds` before the newest one.
    pub fn drift_series_within(&self, range_seconds: f64) -> Vec<DriftPoint> {
        let Some(latest) = self.series.latest() else {
            return Vec::new();
        };
        let range_ns = (range_seconds * NANOS_PER_SEC).min(i64::MAX as f64) as i64;
        self.series
            .snapshot_since(latest.timestamp.saturating_sub(range_ns))
            .into_iter()
            .map(DriftPoint::from)
            .collect()
    }

    /// Newest drift point.
    pub fn latest(&self) -> Option<DriftPoint> {
        self.series.latest().map(DriftPoint::from)
    }

    pub fn point_count(&self) -> usize {
        self.series.len()
    }

    /// Drift rate over the trailing `window_seconds`.
    ///
    /// Pass [`f64::MAX`] for the rate across everything retained.
    pub fn drift_rate(&self, window_seconds: f64) -> Option<DriftRate> {
        drift_rate_over(&self.drift_series(), window_seconds)
    }

    fn reference_drift(&self) -> std::sync::MutexGuard<'_, Option<f64>> {
        self.reference_drift_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ClockDriftTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    const SEC: i64 = 1_000_000_000;
    const START_NS: i64 = 50 * SEC;
    const GPS_BASE_MS: i64 = 1_700_000_000_000;

    fn running_tracker() -> ClockDriftTracker {
        let tracker = ClockDriftTracker::with_clock(Arc::new(ManualClock::new(START_NS)));
        tracker.start().unwrap();
        tracker
    }

    /// Feed a fix `elapsed` seconds after start whose GNSS time leads the
    /// system clock by `drift_ms`.
    fn feed(tracker: &ClockDriftTracker, elapsed_secs: f64, drift_ms: i64) {
        let receipt = START_NS + (elapsed_secs * 1e9) as i64;
        let system_ms = GPS_BASE_MS + (elapsed_secs * 1000.0) as i64;
        tracker
            .ingest(system_ms + drift_ms, receipt, system_ms)
            .unwrap();
    }

    fn point(elapsed_seconds: f64, drift_ms: f64) -> DriftPoint {
        DriftPoint {
            elapsed_seconds,
            drift_ms,
        }
    }

    #[test]
    fn test_reference_sample_is_zero() {
        let tracker = running_tracker();
        feed(&tracker, 3.0, 250);

        let series = tracker.drift_series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].drift_ms, 0.0);
        assert!((series[0].elapsed_seconds - 3.0).abs() < 1e-9);
        assert!(tracker.has_fix());
    }

    #[test]
    fn test_later_samples_keep_raw_drift() {
        let tracker = running_tracker();
        feed(&tracker, 0.0, 40);
        feed(&tracker, 10.0, 2);
        feed(&tracker, 70.0, 8);

        let drifts: Vec<f64> = tracker.drift_series().iter().map(|p| p.drift_ms).collect();
        assert_eq!(drifts, vec![0.0, 2.0, 8.0]);

        let rate = tracker.drift_rate(60.0).unwrap();
        assert!((rate.drift_ms_per_minute - 6.0).abs() < 1e-9);
        assert!((rate.window_seconds - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_window_uses_earliest_point() {
        let tracker = running_tracker();
        feed(&tracker, 0.0, 0);
        feed(&tracker, 10.0, 2);
        feed(&tracker, 70.0, 7);

        let total = tracker.drift_rate(DriftWindow::Total.seconds()).unwrap();
        assert!((total.drift_ms_per_minute - 6.0).abs() < 1e-9);
        assert!((total.window_seconds - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_gps_time_is_dropped() {
        let tracker = running_tracker();
        assert_eq!(
            tracker.ingest(0, START_NS, GPS_BASE_MS),
            Err(IngestError::MissingTimestamp)
        );
        assert!(!tracker.has_fix());
        assert_eq!(tracker.point_count(), 0);
    }

    #[test]
    fn test_sub_second_span_has_no_rate() {
        let points = [point(0.0, 0.0), point(0.5, 3.0)];
        for window in DriftWindow::ALL {
            assert!(drift_rate_over(&points, window.seconds()).is_none());
        }
    }

    #[test]
    fn test_single_point_in_window_has_no_rate() {
        let points = [point(0.0, 0.0), point(100.0, 5.0)];
        assert!(drift_rate_over(&points, 60.0).is_none());
        assert!(drift_rate_over(&points[..1], f64::MAX).is_none());
        assert!(drift_rate_over(&points, 100.0).is_some());
    }

    #[test]
    fn test_eviction_after_thirty_minutes() {
        let tracker = running_tracker();
        feed(&tracker, 0.0, 0);
        feed(&tracker, 900.0, 1);
        feed(&tracker, 1800.0, 2);
        assert_eq!(tracker.point_count(), 3);

        feed(&tracker, 1801.0, 2);
        let series = tracker.drift_series();
        assert_eq!(series.len(), 3);
        assert!((series[0].elapsed_seconds - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_reference_survives_eviction() {
        let tracker = running_tracker();
        feed(&tracker, 0.0, 0);
        feed(&tracker, 10.0, 5);
        feed(&tracker, 2000.0, 9);
        // Both early points are evicted; new points stay relative to the reference.
        feed(&tracker, 2010.0, 11);
        assert_eq!(tracker.latest().unwrap().drift_ms, 11.0);
    }

    #[test]
    fn test_drift_series_within() {
        let tracker = running_tracker();
        for i in 0..10 {
            feed(&tracker, i as f64 * 60.0, i);
        }
        let recent = tracker.drift_series_within(180.0);
        assert_eq!(recent.len(), 4);
        assert!((recent[0].elapsed_seconds - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_restart_continues_timeline() {
        let clock = Arc::new(ManualClock::new(START_NS));
        let tracker = ClockDriftTracker::with_clock(clock.clone());
        tracker.start().unwrap();
        feed(&tracker, 0.0, 0);
        feed(&tracker, 5.0, 1);

        tracker.stop();
        assert!(!tracker.has_fix());
        assert!(!tracker.is_running());
        assert_eq!(tracker.point_count(), 2);

        clock.advance(600 * SEC);
        tracker.start().unwrap();
        feed(&tracker, 605.0, 3);
        let latest = tracker.latest().unwrap();
        assert!((latest.elapsed_seconds - 605.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejected_fix_leaves_has_fix_unset() {
        let tracker = running_tracker();
        feed(&tracker, 10.0, 0);

        tracker.stop();
        tracker.start().unwrap();
        assert!(!tracker.has_fix());

        // Older than the retained point, so the series refuses it.
        let system_ms = GPS_BASE_MS + 5_000;
        let result = tracker.ingest(system_ms, START_NS + 5 * SEC, system_ms);
        assert_eq!(
            result,
            Err(IngestError::OutOfOrder {
                timestamp: 5 * SEC,
                latest: 10 * SEC,
            })
        );
        assert!(!tracker.has_fix());
        assert_eq!(tracker.point_count(), 1);

        feed(&tracker, 12.0, 1);
        assert!(tracker.has_fix());
    }

    #[test]
    fn test_release_clears_everything() {
        let tracker = running_tracker();
        feed(&tracker, 0.0, 0);
        feed(&tracker, 5.0, 1);

        tracker.release();
        assert_eq!(tracker.point_count(), 0);
        assert!(!tracker.has_fix());
        assert!(tracker.drift_rate(f64::MAX).is_none());
        assert_eq!(tracker.start(), Err(LifecycleError::Released));
        assert_eq!(
            tracker.ingest(GPS_BASE_MS, START_NS, GPS_BASE_MS),
            Err(IngestError::Released)
        );
    }
}
