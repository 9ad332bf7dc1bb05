//! Start/stop/release state shared by the analyzers.
//!
//! Ingestion runs through [`Lifecycle::admit`], which holds a read guard on
//! the state for the whole ingestion. `stop` and `release` take the write
//! guard, so once they return no ingestion is in flight and none will be
//! admitted.

use crate::core::series::SeriesError;
use std::sync::{PoisonError, RwLock};

/// Lifecycle state of an analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, never started
    Idle,
    /// Accepting samples
    Running,
    /// Halted; accumulated data is kept
    Stopped,
    /// Terminal; data discarded
    Released,
}

/// Errors from lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    Released,
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::Released => write!(f, "Analyzer has been released"),
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Reasons a sample was not ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    /// The analyzer is idle or stopped.
    NotRunning,
    /// The analyzer was released.
    Released,
    /// The sample carries no usable time (zero timestamp or no GNSS time).
    MissingTimestamp,
    /// The sample's timestamp is older than the newest retained one.
    OutOfOrder { timestamp: i64, latest: i64 },
}

impl From<SeriesError> for IngestError {
    fn from(e: SeriesError) -> Self {
        match e {
            SeriesError::OutOfOrder { timestamp, latest } => {
                IngestError::OutOfOrder { timestamp, latest }
            }
        }
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::NotRunning => write!(f, "Analyzer is not running"),
            IngestError::Released => write!(f, "Analyzer has been released"),
            IngestError::MissingTimestamp => write!(f, "Sample has no time information"),
            IngestError::OutOfOrder { timestamp, latest } => write!(
                f,
                "Out-of-order sample at {timestamp} ns (latest is {latest} ns)"
            ),
        }
    }
}

impl std::error::Error for IngestError {}

/// Guarded lifecycle state.
#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LifecycleState::Idle),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Move to `Running`.
    ///
    /// Returns `Ok(true)` when this call performed the transition, `Ok(false)`
    /// when already running. `on_start` runs under the write guard before the
    /// state flips, so no sample can be admitted ahead of it.
    pub fn start_with<F: FnOnce()>(&self, on_start: F) -> Result<bool, LifecycleError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match *state {
            LifecycleState::Running => Ok(false),
            LifecycleState::Released => Err(LifecycleError::Released),
            LifecycleState::Idle | LifecycleState::Stopped => {
                on_start();
                *state = LifecycleState::Running;
                Ok(true)
            }
        }
    }

    /// Move to `Stopped`. Returns `true` if the analyzer was running.
    pub fn stop(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match *state {
            LifecycleState::Running => {
                *state = LifecycleState::Stopped;
                true
            }
            LifecycleState::Idle => {
                *state = LifecycleState::Stopped;
                false
            }
            LifecycleState::Stopped | LifecycleState::Released => false,
        }
    }

    /// Move to `Released`, running `on_release` under the write guard.
    pub fn release_with<F: FnOnce()>(&self, on_release: F) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        on_release();
        *state = LifecycleState::Released;
    }

    /// Run `ingest` only while running, holding the state for its duration.
    pub fn admit<F>(&self, ingest: F) -> Result<(), IngestError>
    where
        F: FnOnce() -> Result<(), IngestError>,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match *state {
            LifecycleState::Running => ingest(),
            LifecycleState::Released => Err(IngestError::Released),
            LifecycleState::Idle | LifecycleState::Stopped => Err(IngestError::NotRunning),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
