//! Ingestion journal for the telemetry agent.
//!
//! This module keeps running counts of what each source delivered and what
//! the analyzers accepted or dropped, so a session can be audited afterwards.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_journal, create_shared_journal_with_persistence, IngestJournal, JournalStats,
    SharedJournal, StreamKind,
};
