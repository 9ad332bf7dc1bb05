//! Frame timing statistics.
//!
//! Frame-arrival timestamps are reduced to instantaneous rates
//! (`1e9 / delta_ns`) over several trailing windows. Min and max expose
//! frame-pacing outliers that a plain frames-per-duration average hides.

use crate::core::lifecycle::{IngestError, Lifecycle, LifecycleError, LifecycleState};
use crate::core::series::{BoundedSeries, Sample};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// How long frame timestamps are kept (the longest reporting window).
pub const FRAME_RETENTION: Duration = Duration::from_secs(1200);

/// Trailing windows reported by [`FrameTimingAnalyzer::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FpsWindow {
    TenSeconds,
    OneMinute,
    FiveMinutes,
    TwentyMinutes,
}

impl FpsWindow {
    pub const ALL: [FpsWindow; 4] = [
        FpsWindow::TenSeconds,
        FpsWindow::OneMinute,
        FpsWindow::FiveMinutes,
        FpsWindow::TwentyMinutes,
    ];

    pub fn duration(self) -> Duration {
        match self {
            FpsWindow::TenSeconds => Duration::from_secs(10),
            FpsWindow::OneMinute => Duration::from_secs(60),
            FpsWindow::FiveMinutes => Duration::from_secs(300),
            FpsWindow::TwentyMinutes => Duration::from_secs(1200),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FpsWindow::TenSeconds => "10s",
            FpsWindow::OneMinute => "1m",
            FpsWindow::FiveMinutes => "5m",
            FpsWindow::TwentyMinutes => "20m",
        }
    }

    fn nanos(self) -> i64 {
        self.duration().as_nanos() as i64
    }
}

/// Rate statistics for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub min_fps: f64,
    pub max_fps: f64,
    pub mean_fps: f64,
    /// Population standard deviation of the instantaneous rates
    pub std_dev_fps: f64,
    /// Number of frame intervals the rates were taken from
    pub interval_count: usize,
}

/// Frame intervals implied by a [`WindowStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameIntervals {
    pub min_ns: f64,
    pub mean_ns: f64,
    pub max_ns: f64,
}

impl WindowStats {
    /// Reduce ordered timestamps to rate statistics.
    ///
    /// Pairs with a zero delta have no defined rate and are skipped. Returns
    /// `None` when no pair yields a rate.
    pub fn from_timestamps(timestamps: &[i64]) -> Option<Self> {
        let rates: Vec<f64> = timestamps
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|&delta| delta > 0)
            .map(|delta| NANOS_PER_SEC / delta as f64)
            .collect();

        if rates.is_empty() {
            return None;
        }

        Some(Self {
            min_fps: Statistics::min(&rates),
            max_fps: Statistics::max(&rates),
            mean_fps: Statistics::mean(&rates),
            std_dev_fps: Statistics::population_std_dev(&rates),
            interval_count: rates.len(),
        })
    }

    /// Interval lengths: the shortest interval belongs to the highest rate.
    pub fn intervals(&self) -> FrameIntervals {
        FrameIntervals {
            min_ns: NANOS_PER_SEC / self.max_fps,
            mean_ns: NANOS_PER_SEC / self.mean_fps,
            max_ns: NANOS_PER_SEC / self.min_fps,
        }
    }
}

/// Frame count plus per-window statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpsStats {
    /// Frames recorded since the analyzer was created
    pub frame_count: u64,
    pub ten_sec: Option<WindowStats>,
    pub one_min: Option<WindowStats>,
    pub five_min: Option<WindowStats>,
    pub twenty_min: Option<WindowStats>,
}

impl FpsStats {
    pub fn window(&self, window: FpsWindow) -> Option<&WindowStats> {
        match window {
            FpsWindow::TenSeconds => self.ten_sec.as_ref(),
            FpsWindow::OneMinute => self.one_min.as_ref(),
            FpsWindow::FiveMinutes => self.five_min.as_ref(),
            FpsWindow::TwentyMinutes => self.twenty_min.as_ref(),
        }
    }
}

/// Turns frame-arrival timestamps into rolling frame-rate statistics.
#[derive(Debug)]
pub struct FrameTimingAnalyzer {
    lifecycle: Lifecycle,
    series: BoundedSeries<()>,
    frame_count: AtomicU64,
}

impl FrameTimingAnalyzer {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            series: BoundedSeries::new(FRAME_RETENTION),
            frame_count: AtomicU64::new(0),
        }
    }

    /// Begin accepting frames. A no-op when already running.
    pub fn start(&self) -> Result<(), LifecycleError> {
        if self.lifecycle.start_with(|| {})? {
            tracing::debug!("Frame timing analyzer started");
        }
        Ok(())
    }

    /// Stop accepting frames, keeping what has been collected.
    pub fn stop(&self) {
        if self.lifecycle.stop() {
            tracing::debug!(
                frames = self.frame_count(),
                "Frame timing analyzer stopped"
            );
        }
    }

    /// Stop for good and discard all collected data.
    pub fn release(&self) {
        self.lifecycle.release_with(|| {
            self.series.clear();
            self.frame_count.store(0, Ordering::SeqCst);
        });
        tracing::debug!("Frame timing analyzer released");
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Frames accepted so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::SeqCst)
    }

    /// Record one frame-arrival timestamp in nanoseconds.
    pub fn record(&self, timestamp_ns: i64) -> Result<(), IngestError> {
        self.lifecycle.admit(|| {
            if timestamp_ns == 0 {
                return Err(IngestError::MissingTimestamp);
            }
            self.series.append(timestamp_ns, ())?;
            self.frame_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    /// Statistics for every window, or `None` with fewer than two frames.
    pub fn stats(&self) -> Option<FpsStats> {
        let timestamps: Vec<i64> = self
            .series
            .snapshot()
            .iter()
            .map(|s: &Sample<()>| s.timestamp)
            .collect();
        if timestamps.len() < 2 {
            return None;
        }
        let latest = *timestamps.last()?;

        let window_stats = |window: FpsWindow| {
            let cutoff = latest.saturating_sub(window.nanos());
            let start = timestamps.partition_point(|&t| t < cutoff);
            let selected = &timestamps[start..];
            if selected.len() < 2 {
                return None;
            }
            WindowStats::from_timestamps(selected)
        };

        Some(FpsStats {
            frame_count: self.frame_count(),
            ten_sec: window_stats(FpsWindow::TenSeconds),
            one_min: window_stats(FpsWindow::OneMinute),
            five_min: window_stats(FpsWindow::FiveMinutes),
            twenty_min: window_stats(FpsWindow::TwentyMinutes),
        })
    }
}

impl Default for FrameTimingAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: i64 = 1_000_000_000;
    const FRAME_30FPS: i64 = 33_333_333;

    fn running_analyzer() -> FrameTimingAnalyzer {
        let analyzer = FrameTimingAnalyzer::new();
        analyzer.start().unwrap();
        analyzer
    }

    #[test]
    fn test_steady_30fps() {
        let analyzer = running_analyzer();
        for i in 0..5 {
            analyzer.record(SEC + i * FRAME_30FPS).unwrap();
        }

        let stats = analyzer.stats().unwrap();
        assert_eq!(stats.frame_count, 5);
        for window in FpsWindow::ALL {
            let w = stats.window(window).unwrap();
            assert!((w.min_fps - 30.0).abs() < 1e-6);
            assert!((w.max_fps - 30.0).abs() < 1e-6);
            assert!((w.mean_fps - 30.0).abs() < 1e-6);
            assert_eq!(w.interval_count, 4);
        }
    }

    #[test]
    fn test_single_frame_has_no_stats() {
        let analyzer = running_analyzer();
        analyzer.record(SEC).unwrap();
        assert!(analyzer.stats().is_none());
        assert_eq!(analyzer.frame_count(), 1);
    }

    #[test]
    fn test_jitter_shows_in_min_max() {
        let analyzer = running_analyzer();
        // 20 ms, 40 ms, 20 ms intervals -> 50, 25, 50 fps
        for t in [SEC, SEC + 20_000_000, SEC + 60_000_000, SEC + 80_000_000] {
            analyzer.record(t).unwrap();
        }

        let w = analyzer.stats().unwrap().ten_sec.unwrap();
        assert!((w.min_fps - 25.0).abs() < 1e-9);
        assert!((w.max_fps - 50.0).abs() < 1e-9);
        assert!((w.mean_fps - 125.0 / 3.0).abs() < 1e-9);
        assert!(w.std_dev_fps > 0.0);

        let intervals = w.intervals();
        assert!((intervals.min_ns - 20_000_000.0).abs() < 1e-3);
        assert!((intervals.max_ns - 40_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_deltas_are_skipped() {
        let analyzer = running_analyzer();
        analyzer.record(SEC).unwrap();
        analyzer.record(SEC).unwrap();
        assert!(analyzer.stats().unwrap().ten_sec.is_none());

        analyzer.record(SEC + 100_000_000).unwrap();
        let w = analyzer.stats().unwrap().ten_sec.unwrap();
        assert_eq!(w.interval_count, 1);
        assert!((w.mean_fps - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_window_absent_after_gap() {
        let analyzer = running_analyzer();
        analyzer.record(SEC).unwrap();
        analyzer.record(2 * SEC).unwrap();
        // A 30 s gap leaves only the newest frame inside the 10 s window.
        analyzer.record(32 * SEC).unwrap();

        let stats = analyzer.stats().unwrap();
        assert!(stats.ten_sec.is_none());
        let one_min = stats.one_min.unwrap();
        assert_eq!(one_min.interval_count, 2);
        assert!((one_min.max_fps - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_sets_nest() {
        let analyzer = running_analyzer();
        // Frames every 7 s for 25 minutes.
        for i in 0..215 {
            analyzer.record(SEC + i * 7 * SEC).unwrap();
        }

        let stats = analyzer.stats().unwrap();
        let counts: Vec<usize> = FpsWindow::ALL
            .iter()
            .map(|&w| stats.window(w).map_or(0, |s| s.interval_count))
            .collect();
        assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
        // Retention caps the longest window at 1200 s worth of frames.
        assert!(counts[3] <= 1200 / 7 + 1);
    }

    #[test]
    fn test_rejected_frames_do_not_count() {
        let analyzer = FrameTimingAnalyzer::new();
        assert_eq!(analyzer.record(SEC), Err(IngestError::NotRunning));

        analyzer.start().unwrap();
        analyzer.record(5 * SEC).unwrap();
        assert_eq!(analyzer.record(0), Err(IngestError::MissingTimestamp));
        assert_eq!(
            analyzer.record(4 * SEC),
            Err(IngestError::OutOfOrder {
                timestamp: 4 * SEC,
                latest: 5 * SEC
            })
        );
        assert_eq!(analyzer.frame_count(), 1);
    }

    #[test]
    fn test_no_frames_counted_after_stop_returns() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let analyzer = Arc::new(running_analyzer());
        let producer = {
            let analyzer = Arc::clone(&analyzer);
            thread::spawn(move || {
                let mut accepted = 0u64;
                let mut timestamp = SEC;
                while analyzer.record(timestamp).is_ok() {
                    accepted += 1;
                    timestamp += 1_000;
                }
                accepted
            })
        };

        thread::sleep(Duration::from_millis(20));
        analyzer.stop();
        let count_at_stop = analyzer.frame_count();

        let accepted = producer.join().unwrap();
        assert_eq!(analyzer.frame_count(), count_at_stop);
        assert_eq!(accepted, count_at_stop);
    }

    #[test]
    fn test_stop_keeps_data_release_clears() {
        let analyzer = running_analyzer();
        analyzer.record(SEC).unwrap();
        analyzer.record(2 * SEC).unwrap();

        analyzer.stop();
        analyzer.stop();
        assert!(!analyzer.is_running());
        assert_eq!(analyzer.record(3 * SEC), Err(IngestError::NotRunning));
        assert_eq!(analyzer.stats().unwrap().frame_count, 2);

        analyzer.start().unwrap();
        analyzer.record(3 * SEC).unwrap();
        assert_eq!(analyzer.frame_count(), 3);

        analyzer.release();
        assert_eq!(analyzer.frame_count(), 0);
        assert!(analyzer.stats().is_none());
        assert_eq!(analyzer.start(), Err(LifecycleError::Released));
        assert_eq!(analyzer.record(4 * SEC), Err(IngestError::Released));
    }
}
