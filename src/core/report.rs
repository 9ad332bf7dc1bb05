//! Telemetry report builder.
//!
//! A report is one poll of both analyzers: whether each is running, the
//! current frame-rate statistics, and the drift points and rates. Absent
//! values mean "not enough data yet" and serialize as `null`.

use crate::core::drift::{ClockDriftTracker, DriftPoint, DriftRate, DriftWindow};
use crate::core::fps::{FpsStats, FpsWindow, FrameTimingAnalyzer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "phonestats-telemetry";

/// Camera frame timing part of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSection {
    pub running: bool,
    pub stats: Option<FpsStats>,
}

/// Drift rates for the polled windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftRates {
    pub one_min: Option<DriftRate>,
    pub five_min: Option<DriftRate>,
    pub twenty_min: Option<DriftRate>,
    pub total: Option<DriftRate>,
}

impl DriftRates {
    pub fn window(&self, window: DriftWindow) -> Option<&DriftRate> {
        match window {
            DriftWindow::OneMinute => self.one_min.as_ref(),
            DriftWindow::FiveMinutes => self.five_min.as_ref(),
            DriftWindow::TwentyMinutes => self.twenty_min.as_ref(),
            DriftWindow::Total => self.total.as_ref(),
        }
    }
}

/// GNSS clock drift part of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnssSection {
    pub running: bool,
    pub has_fix: bool,
    pub point_count: usize,
    pub latest: Option<DriftPoint>,
    pub rates: DriftRates,
    /// Drift points, only filled when the builder asks for them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<DriftPoint>,
}

/// One poll of both analyzers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub producer: String,
    pub version: String,
    pub instance_id: Uuid,
    pub device: String,
    pub generated_at: DateTime<Utc>,
    pub camera: CameraSection,
    pub gnss: GnssSection,
}

impl TelemetryReport {
    /// One-line rendering for console polling.
    pub fn summary_line(&self) -> String {
        let camera = if !self.camera.running {
            "camera: stopped".to_string()
        } else {
            match &self.camera.stats {
                None => "camera: collecting".to_string(),
                Some(stats) => {
                    let windows: Vec<String> = FpsWindow::ALL
                        .iter()
                        .map(|&w| match stats.window(w) {
                            Some(s) => format!(
                                "{} {:.2}/{:.2}/{:.2}",
                                w.label(),
                                s.min_fps,
                                s.mean_fps,
                                s.max_fps
                            ),
                            None => format!("{} -", w.label()),
                        })
                        .collect();
                    format!("frames {} | fps {}", stats.frame_count, windows.join(" "))
                }
            }
        };

        let gnss = if !self.gnss.running {
            "gnss: stopped".to_string()
        } else if !self.gnss.has_fix {
            "gnss: waiting for fix".to_string()
        } else {
            let rates: Vec<String> = DriftWindow::ALL
                .iter()
                .map(|&w| match self.gnss.rates.window(w) {
                    Some(r) => format!("{} {:.6}", w.label(), r.drift_ms_per_minute),
                    None => format!("{} -", w.label()),
                })
                .collect();
            let latest = self
                .gnss
                .latest
                .map(|p| format!("{:.1} ms", p.drift_ms))
                .unwrap_or_else(|| "-".to_string());
            format!("drift {} | ms/min {}", latest, rates.join(" "))
        };

        format!("{camera} || {gnss}")
    }
}

/// Builds [`TelemetryReport`]s for one session.
pub struct ReportBuilder {
    instance_id: Uuid,
    device: String,
    include_points: bool,
}

impl ReportBuilder {
    /// Create a builder with a fresh instance ID, named after this host.
    pub fn new() -> Self {
        let device = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            instance_id: Uuid::new_v4(),
            device,
            include_points: false,
        }
    }

    /// Override the device name.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Include the full drift series in each report.
    pub fn with_points(mut self, include_points: bool) -> Self {
        self.include_points = include_points;
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Poll both analyzers.
    pub fn build(&self, fps: &FrameTimingAnalyzer, drift: &ClockDriftTracker) -> TelemetryReport {
        // One snapshot backs every drift figure in this report.
        let points = drift.drift_series();
        let rate = |w: DriftWindow| crate::core::drift::drift_rate_over(&points, w.seconds());

        let gnss = GnssSection {
            running: drift.is_running(),
            has_fix: drift.has_fix(),
            point_count: points.len(),
            latest: points.last().copied(),
            rates: DriftRates {
                one_min: rate(DriftWindow::OneMinute),
                five_min: rate(DriftWindow::FiveMinutes),
                twenty_min: rate(DriftWindow::TwentyMinutes),
                total: rate(DriftWindow::Total),
            },
            points: if self.include_points {
                points.clone()
            } else {
                Vec::new()
            },
        };

        TelemetryReport {
            producer: PRODUCER_NAME.to_string(),
            version: crate::VERSION.to_string(),
            instance_id: self.instance_id,
            device: self.device.clone(),
            generated_at: Utc::now(),
            camera: CameraSection {
                running: fps.is_running(),
                stats: fps.stats(),
            },
            gnss,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
