//! Phonestats Telemetry CLI
//!
//! Rolling frame-timing and GNSS clock-drift statistics.

use chrono::Utc;
use clap::{Parser, Subcommand};
use phonestats_telemetry::{
    config::Config,
    core::{ClockDriftTracker, FrameTimingAnalyzer, ManualClock, ReportBuilder},
    journal::{create_shared_journal, create_shared_journal_with_persistence, SharedJournal},
    source::{
        first_monotonic_ns, load_recording, replay, CameraProfile, FrameEvent, GnssProfile,
        IngestHandle, IngestWorker, LocationFix, SimulatedSource,
    },
    TelemetryReport, VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phonestats")]
#[command(version = VERSION)]
#[command(about = "Rolling frame-timing and GNSS clock-drift statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run synthetic camera and GNSS sources and poll the statistics
    Monitor {
        /// Camera frame rate to simulate
        #[arg(long)]
        fps: Option<f64>,

        /// System clock drift to simulate, in parts per million
        #[arg(long)]
        drift_ppm: Option<f64>,

        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Replay a JSON-lines recording and print the resulting report
    Replay {
        /// Recording to replay
        file: PathBuf,

        /// Write the report here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Include every drift point in the report
        #[arg(long)]
        points: bool,
    },

    /// Show cumulative ingestion counts
    Status,

    /// Show configuration
    Config,
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor {
            fps,
            drift_ppm,
            duration,
        } => {
            cmd_monitor(fps, drift_ppm, duration);
        }
        Commands::Replay {
            file,
            output,
            points,
        } => {
            cmd_replay(file, output, points);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

/// Ingestion workers for both analyzers.
struct Pipeline {
    frames: IngestHandle<FrameEvent>,
    fixes: IngestHandle<LocationFix>,
}

fn spawn_pipeline(
    analyzer: &Arc<FrameTimingAnalyzer>,
    tracker: &Arc<ClockDriftTracker>,
    capacity: usize,
    journal: &SharedJournal,
) -> Pipeline {
    let frames = IngestWorker::spawn(
        "frame-ingest",
        capacity,
        Arc::clone(analyzer),
        Arc::clone(journal),
    );
    let fixes = IngestWorker::spawn(
        "fix-ingest",
        capacity,
        Arc::clone(tracker),
        Arc::clone(journal),
    );

    match (frames, fixes) {
        (Ok(frames), Ok(fixes)) => Pipeline { frames, fixes },
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error starting ingestion: {e}");
            std::process::exit(1);
        }
    }
}

fn start_analyzers(analyzer: &FrameTimingAnalyzer, tracker: &ClockDriftTracker) {
    if let Err(e) = analyzer.start().and_then(|_| tracker.start()) {
        eprintln!("Error starting analyzers: {e}");
        std::process::exit(1);
    }
}

fn cmd_monitor(fps: Option<f64>, drift_ppm: Option<f64>, duration: Option<u64>) {
    println!("Phonestats Telemetry v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let camera_profile = CameraProfile {
        target_fps: fps.unwrap_or(config.simulation.target_fps),
        jitter_fraction: config.simulation.jitter_fraction,
    };
    let gnss_profile = GnssProfile {
        drift_ppm: drift_ppm.unwrap_or(config.simulation.drift_ppm),
        fix_interval: config.simulation.fix_interval,
    };

    println!("Starting simulated sources...");
    println!("  Camera: {:.2} fps", camera_profile.target_fps);
    println!("  GNSS drift: {:.3} ppm", gnss_profile.drift_ppm);
    println!("  Poll interval: {}ms", config.poll_interval.as_millis());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let journal = create_shared_journal_with_persistence(config.journal_path());
    let analyzer = Arc::new(FrameTimingAnalyzer::new());
    let tracker = Arc::new(ClockDriftTracker::new());
    let pipeline = spawn_pipeline(&analyzer, &tracker, config.channel_capacity, &journal);
    start_analyzers(&analyzer, &tracker);

    let report_builder = ReportBuilder::new();
    println!("Instance ID: {}", report_builder.instance_id());

    let camera = SimulatedSource::camera(camera_profile, pipeline.frames.clone());
    let gnss = SimulatedSource::gnss(gnss_profile, pipeline.fixes.clone());
    let (mut camera, mut gnss) = match (camera, gnss) {
        (Ok(camera), Ok(gnss)) => (camera, gnss),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error starting simulated sources: {e}");
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running));

    let started = Instant::now();
    let deadline = duration.map(Duration::from_secs);

    while running.load(Ordering::SeqCst) {
        thread::sleep(config.poll_interval);

        let report = report_builder.build(&analyzer, &tracker);
        println!(
            "[{}] {}",
            report.generated_at.format("%H:%M:%S"),
            report.summary_line()
        );

        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
    }

    println!();
    println!("Stopping collection...");

    // Sources first, then drain the channels, then halt the analyzers.
    camera.stop();
    gnss.stop();
    pipeline.frames.close();
    pipeline.fixes.close();

    let report = report_builder.with_points(true).build(&analyzer, &tracker);
    analyzer.stop();
    tracker.stop();
    export_report(&config, &report, &journal);

    analyzer.release();
    tracker.release();

    if let Err(e) = journal.save() {
        eprintln!("Warning: Could not save journal: {e}");
    }

    println!();
    println!("{}", journal.summary());
}

fn export_report(config: &Config, report: &TelemetryReport, journal: &SharedJournal) {
    let export_path = config.export_path.join(format!(
        "report_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    if let Some(parent) = export_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match serde_json::to_string_pretty(report) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&export_path, json) {
                eprintln!("Error writing report: {e}");
            } else {
                println!("Exported report to {export_path:?}");
                journal.record_report_exported();
            }
        }
        Err(e) => {
            eprintln!("Error serializing report: {e}");
        }
    }
}

fn cmd_replay(file: PathBuf, output: Option<PathBuf>, points: bool) {
    let config = Config::load().unwrap_or_default();

    let events = match load_recording(&file) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Error reading recording: {e}");
            std::process::exit(1);
        }
    };

    let Some(origin) = first_monotonic_ns(&events) else {
        println!("No events found in {file:?}");
        return;
    };

    let journal = create_shared_journal();
    let analyzer = Arc::new(FrameTimingAnalyzer::new());
    // Recorded receipt times are on the recording device's clock.
    let tracker = Arc::new(ClockDriftTracker::with_clock(Arc::new(ManualClock::new(
        origin,
    ))));
    let pipeline = spawn_pipeline(&analyzer, &tracker, config.channel_capacity, &journal);
    start_analyzers(&analyzer, &tracker);

    let summary = match replay(&events, &pipeline.frames, &pipeline.fixes) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error replaying recording: {e}");
            std::process::exit(1);
        }
    };
    pipeline.frames.close();
    pipeline.fixes.close();

    let report = ReportBuilder::new()
        .with_points(points)
        .build(&analyzer, &tracker);
    analyzer.stop();
    tracker.stop();

    let stats = journal.stats();
    tracing::info!(
        frames = summary.frames,
        fixes = summary.fixes,
        frames_dropped = stats.frames_dropped,
        fixes_dropped = stats.fixes_dropped,
        "Replay complete"
    );

    let json = match serde_json::to_string_pretty(&report) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing report: {e}");
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => match std::fs::write(&path, json) {
            Ok(()) => println!("Wrote report to {path:?}"),
            Err(e) => {
                eprintln!("Error writing report: {e}");
                std::process::exit(1);
            }
        },
        None => println!("{json}"),
    }
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Phonestats Telemetry Status");
    println!("===========================");
    println!();

    let journal_path = config.journal_path();
    if journal_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&journal_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for key in [
                    "frames_accepted",
                    "frames_dropped",
                    "fixes_accepted",
                    "fixes_dropped",
                    "reports_exported",
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {}: {value}", key.replace('_', " "));
                    }
                }
                if let Some(updated) = stats.get("last_updated") {
                    println!("  last updated: {updated}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });

    println!("Phonestats Configuration ({:?})", Config::config_path());
    println!();
    println!("{}", config.describe());
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
