//! Counters of ingested and dropped samples.
//!
//! Drops are expected (a stopped analyzer, a fix without GNSS time, a full
//! channel); the journal records how many without logging each one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Which stream a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Frames,
    Fixes,
}

/// Ingestion counters for the current session.
#[derive(Debug)]
pub struct IngestJournal {
    /// Frames accepted by the frame timing analyzer
    frames_accepted: AtomicU64,
    /// Frames refused or dropped before reaching it
    frames_dropped: AtomicU64,
    /// Fixes accepted by the drift tracker
    fixes_accepted: AtomicU64,
    /// Fixes refused or dropped before reaching it
    fixes_dropped: AtomicU64,
    /// Number of reports exported
    reports_exported: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl IngestJournal {
    /// Create a new journal.
    pub fn new() -> Self {
        Self {
            frames_accepted: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            fixes_accepted: AtomicU64::new(0),
            fixes_dropped: AtomicU64::new(0),
            reports_exported: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a journal that persists to `path`, continuing any saved counts.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut journal = Self::new();
        journal.persist_path = Some(path);

        if let Err(e) = journal.load() {
            tracing::warn!("Could not load previous journal: {e}");
        }

        journal
    }

    /// Count a sample accepted by an analyzer.
    pub fn record_accepted(&self, stream: StreamKind) {
        match stream {
            StreamKind::Frames => self.frames_accepted.fetch_add(1, Ordering::Relaxed),
            StreamKind::Fixes => self.fixes_accepted.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Count a sample that never made it into an analyzer.
    pub fn record_dropped(&self, stream: StreamKind) {
        match stream {
            StreamKind::Frames => self.frames_dropped.fetch_add(1, Ordering::Relaxed),
            StreamKind::Fixes => self.fixes_dropped.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record an exported report.
    pub fn record_report_exported(&self) {
        self.reports_exported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> JournalStats {
        JournalStats {
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            fixes_accepted: self.fixes_accepted.load(Ordering::Relaxed),
            fixes_dropped: self.fixes_dropped.load(Ordering::Relaxed),
            reports_exported: self.reports_exported.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Frames accepted: {}\n\
             - Frames dropped: {}\n\
             - Fixes accepted: {}\n\
             - Fixes dropped: {}\n\
             - Reports exported: {}\n\
             - Session duration: {} seconds",
            stats.frames_accepted,
            stats.frames_dropped,
            stats.fixes_accepted,
            stats.fixes_dropped,
            stats.reports_exported,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_accepted: stats.frames_accepted,
                frames_dropped: stats.frames_dropped,
                fixes_accepted: stats.fixes_accepted,
                fixes_dropped: stats.fixes_dropped,
                reports_exported: stats.reports_exported,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_accepted
                    .store(persisted.frames_accepted, Ordering::Relaxed);
                self.frames_dropped
                    .store(persisted.frames_dropped, Ordering::Relaxed);
                self.fixes_accepted
                    .store(persisted.fixes_accepted, Ordering::Relaxed);
                self.fixes_dropped
                    .store(persisted.fixes_dropped, Ordering::Relaxed);
                self.reports_exported
                    .store(persisted.reports_exported, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.frames_accepted.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.fixes_accepted.store(0, Ordering::Relaxed);
        self.fixes_dropped.store(0, Ordering::Relaxed);
        self.reports_exported.store(0, Ordering::Relaxed);
    }
}

impl Default for IngestJournal {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of journal counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalStats {
    pub frames_accepted: u64,
    pub frames_dropped: u64,
    pub fixes_accepted: u64,
    pub fixes_dropped: u64,
    pub reports_exported: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_accepted: u64,
    frames_dropped: u64,
    fixes_accepted: u64,
    fixes_dropped: u64,
    reports_exported: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared journal.
pub type SharedJournal = Arc<IngestJournal>;

/// Create a new shared journal.
pub fn create_shared_journal() -> SharedJournal {
    Arc::new(IngestJournal::new())
}

/// Create a new shared journal with persistence.
pub fn create_shared_journal_with_persistence(path: PathBuf) -> SharedJournal {
    Arc::new(IngestJournal::with_persistence(path))
}
