//! Channel-fed ingestion workers.
//!
//! Each analyzer gets one worker thread reading from a bounded channel, so
//! ingestion for an analyzer is strictly serialized and the producer never
//! waits on the analyzer's work beyond the channel's capacity.

use crate::core::drift::ClockDriftTracker;
use crate::core::fps::FrameTimingAnalyzer;
use crate::core::lifecycle::IngestError;
use crate::journal::{SharedJournal, StreamKind};
use crate::source::types::{FrameEvent, LocationFix};
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Something that consumes source events.
pub trait IngestSink<E>: Send + Sync {
    /// Stream the sink belongs to, for journaling.
    fn stream(&self) -> StreamKind;

    fn ingest(&self, event: E) -> Result<(), IngestError>;
}

impl IngestSink<FrameEvent> for FrameTimingAnalyzer {
    fn stream(&self) -> StreamKind {
        StreamKind::Frames
    }

    fn ingest(&self, event: FrameEvent) -> Result<(), IngestError> {
        self.record(event.timestamp_ns)
    }
}

impl IngestSink<LocationFix> for ClockDriftTracker {
    fn stream(&self) -> StreamKind {
        StreamKind::Fixes
    }

    fn ingest(&self, fix: LocationFix) -> Result<(), IngestError> {
        ClockDriftTracker::ingest(
            self,
            fix.gps_epoch_ms,
            fix.monotonic_receipt_ns,
            fix.system_epoch_ms,
        )
    }
}

/// Errors handing events to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// The channel is full; the event was dropped.
    Backpressure,
    /// The worker has shut down.
    Disconnected,
    /// Spawning the worker thread failed.
    SpawnFailed,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Backpressure => write!(f, "Ingestion channel is full"),
            SourceError::Disconnected => write!(f, "Ingestion worker has shut down"),
            SourceError::SpawnFailed => write!(f, "Could not spawn ingestion worker"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Producer side of an ingestion worker.
pub struct IngestHandle<E> {
    sender: Sender<E>,
    worker: Option<JoinHandle<()>>,
    stream: StreamKind,
    journal: SharedJournal,
}

impl<E> Clone for IngestHandle<E> {
    /// Clones share the channel but not the worker's join handle.
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            worker: None,
            stream: self.stream,
            journal: Arc::clone(&self.journal),
        }
    }
}

impl<E: Send + 'static> IngestHandle<E> {
    /// Hand over an event without blocking; a full channel drops it.
    pub fn offer(&self, event: E) -> Result<(), SourceError> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.journal.record_dropped(self.stream);
                tracing::trace!(stream = ?self.stream, "Channel full, event dropped");
                Err(SourceError::Backpressure)
            }
            Err(TrySendError::Disconnected(_)) => Err(SourceError::Disconnected),
        }
    }

    /// Hand over an event, waiting for channel space.
    pub fn send(&self, event: E) -> Result<(), SourceError> {
        self.sender.send(event).map_err(|_| SourceError::Disconnected)
    }

    /// Events waiting in the channel.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    /// Close the channel and wait for the worker to drain it.
    ///
    /// Other clones of this handle keep the channel open; the worker only
    /// ends once every clone is gone.
    pub fn close(mut self) {
        let worker = self.worker.take();
        drop(self);
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::warn!("Ingestion worker panicked");
            }
        }
    }
}

/// Spawns ingestion workers.
pub struct IngestWorker;

impl IngestWorker {
    /// Start a worker thread feeding `sink` from a channel of `capacity` events.
    pub fn spawn<E, S>(
        name: &str,
        capacity: usize,
        sink: Arc<S>,
        journal: SharedJournal,
    ) -> Result<IngestHandle<E>, SourceError>
    where
        E: Send + 'static,
        S: IngestSink<E> + 'static,
    {
        let (sender, receiver) = bounded::<E>(capacity.max(1));
        let stream = sink.stream();
        let worker_journal = Arc::clone(&journal);

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for event in receiver.iter() {
                    match sink.ingest(event) {
                        Ok(()) => worker_journal.record_accepted(stream),
                        Err(e) => {
                            worker_journal.record_dropped(stream);
                            tracing::trace!(stream = ?stream, reason = %e, "Sample dropped");
                        }
                    }
                }
                tracing::debug!(stream = ?stream, "Ingestion worker finished");
            })
            .map_err(|_| SourceError::SpawnFailed)?;

        Ok(IngestHandle {
            sender,
            worker: Some(worker),
            stream,
            journal,
        })
    }
}
