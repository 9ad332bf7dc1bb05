//! Demonstration of the frame-timing and clock-drift analyzers.
//!
//! This example shows how to:
//! 1. Drive both analyzers from a simulated timeline
//! 2. Poll rolling statistics as a dashboard would
//! 3. Produce a final JSON report
//!
//! Twenty-five simulated minutes are processed instantly, so the longest
//! windows fill up and drift points start to fall out of retention.
//!
//! Run with: cargo run --example drift_demo

use std::sync::Arc;

use phonestats_telemetry::{
    core::{ClockDriftTracker, FrameTimingAnalyzer, ManualClock, ReportBuilder},
    source::{CameraProfile, GnssProfile},
};

const SIMULATED_MINUTES: i64 = 25;
const MINUTE_NS: i64 = 60_000_000_000;
const SYSTEM_EPOCH_MS: i64 = 1_700_000_000_000;

fn main() {
    println!("Phonestats Telemetry - Drift Demo");
    println!("=================================");
    println!();

    let camera = CameraProfile {
        target_fps: 29.97,
        jitter_fraction: 0.08,
    };
    let gnss = GnssProfile {
        drift_ppm: 25.0,
        fix_interval: std::time::Duration::from_secs(1),
    };

    let clock = Arc::new(ManualClock::new(1));
    let analyzer = FrameTimingAnalyzer::new();
    let tracker = ClockDriftTracker::with_clock(clock.clone());
    if let Err(e) = analyzer.start().and_then(|_| tracker.start()) {
        eprintln!("Error starting analyzers: {e}");
        return;
    }

    let builder = ReportBuilder::new().with_device("demo-phone");
    println!("Instance ID: {}", builder.instance_id());
    println!(
        "Simulating {SIMULATED_MINUTES} minutes at {:.2} fps, {:.1} ppm drift",
        camera.target_fps, gnss.drift_ppm
    );
    println!();

    let fix_interval_ns = gnss.fix_interval.as_nanos() as i64;
    let mut frame_index = 0u64;
    let mut next_frame_ns = 1i64;
    let mut next_fix_ns = 1i64;

    for minute in 1..=SIMULATED_MINUTES {
        let minute_end = 1 + minute * MINUTE_NS;

        while next_frame_ns < minute_end || next_fix_ns < minute_end {
            if next_frame_ns <= next_fix_ns {
                clock.set(next_frame_ns);
                if let Err(e) = analyzer.record(next_frame_ns) {
                    eprintln!("Frame rejected: {e}");
                }
                next_frame_ns += camera.interval_ns(frame_index);
                frame_index += 1;
            } else {
                clock.set(next_fix_ns);
                let system_ms = SYSTEM_EPOCH_MS + next_fix_ns / 1_000_000;
                let gps_ms = system_ms + gnss.drift_ms_after(next_fix_ns).round() as i64;
                if let Err(e) = tracker.ingest(gps_ms, next_fix_ns, system_ms) {
                    eprintln!("Fix rejected: {e}");
                }
                next_fix_ns += fix_interval_ns;
            }
        }

        if minute % 5 == 0 {
            let report = builder.build(&analyzer, &tracker);
            println!("[{minute:>2} min] {}", report.summary_line());
        }
    }

    println!();
    println!("Retained drift points: {}", tracker.point_count());
    if let Some(first) = tracker.drift_series().first() {
        println!("Oldest point: {:.0} s", first.elapsed_seconds);
    }
    println!();

    let report = builder.build(&analyzer, &tracker);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("Final report (truncated):");
            for line in json.lines().take(30) {
                println!("  {line}");
            }
            println!("  ...");
        }
        Err(e) => eprintln!("Error serializing report: {e}"),
    }

    analyzer.release();
    tracker.release();
}
