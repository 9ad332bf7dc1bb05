//! Bounded, time-ordered sample storage.
//!
//! A [`BoundedSeries`] keeps an append-only run of timestamped samples and
//! evicts everything older than its retention horizon on each append. One
//! producer appends while any number of readers take snapshots.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// A single timestamped value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<V> {
    /// Monotonic timestamp in nanoseconds
    pub timestamp: i64,
    /// Payload carried by the sample
    pub value: V,
}

/// Errors returned by [`BoundedSeries::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesError {
    /// The timestamp is older than the newest retained sample.
    OutOfOrder { timestamp: i64, latest: i64 },
}

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesError::OutOfOrder { timestamp, latest } => write!(
                f,
                "Timestamp {timestamp} ns is older than the latest sample at {latest} ns"
            ),
        }
    }
}

impl std::error::Error for SeriesError {}

/// Append-only series with automatic eviction past a retention horizon.
///
/// Timestamps must be non-decreasing. An append that would move time
/// backwards is rejected and leaves the series untouched, so window bounds
/// computed from the newest sample always stay valid.
#[derive(Debug)]
pub struct BoundedSeries<V> {
    retention_ns: i64,
    samples: RwLock<VecDeque<Sample<V>>>,
}

impl<V: Clone> BoundedSeries<V> {
    /// Create an empty series that retains `retention` worth of samples.
    pub fn new(retention: Duration) -> Self {
        Self {
            retention_ns: i64::try_from(retention.as_nanos()).unwrap_or(i64::MAX),
            samples: RwLock::new(VecDeque::new()),
        }
    }

    /// Retention horizon of this series.
    pub fn retention(&self) -> Duration {
        Duration::from_nanos(self.retention_ns as u64)
    }

    /// Append a sample to the tail, evicting samples that fell out of retention.
    pub fn append(&self, timestamp: i64, value: V) -> Result<(), SeriesError> {
        let mut samples = self.write();

        if let Some(last) = samples.back() {
            if timestamp < last.timestamp {
                return Err(SeriesError::OutOfOrder {
                    timestamp,
                    latest: last.timestamp,
                });
            }
        }

        samples.push_back(Sample { timestamp, value });

        let cutoff = timestamp.saturating_sub(self.retention_ns);
        while samples.front().is_some_and(|s| s.timestamp < cutoff) {
            samples.pop_front();
        }

        Ok(())
    }

    /// Point-in-time copy of every retained sample, oldest first.
    pub fn snapshot(&self) -> Vec<Sample<V>> {
        self.read().iter().cloned().collect()
    }

    /// Copy of the samples with `timestamp >= cutoff`, oldest first.
    pub fn snapshot_since(&self, cutoff: i64) -> Vec<Sample<V>> {
        let samples = self.read();
        let start = samples.partition_point(|s| s.timestamp < cutoff);
        samples.range(start..).cloned().collect()
    }

    /// Newest sample, if any.
    pub fn latest(&self) -> Option<Sample<V>> {
        self.read().back().cloned()
    }

    /// Oldest retained sample, if any.
    pub fn first(&self) -> Option<Sample<V>> {
        self.read().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every sample and release the backing storage.
    pub fn clear(&self) {
        let mut samples = self.write();
        samples.clear();
        samples.shrink_to_fit();
    }

    // Samples are plain values; a panicking writer cannot leave them half-updated.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Sample<V>>> {
        self.samples.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Sample<V>>> {
        self.samples.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const SEC: i64 = 1_000_000_000;

    #[test]
    fn test_append_and_latest() {
        let series = BoundedSeries::new(Duration::from_secs(10));
        assert!(series.latest().is_none());

        series.append(SEC, 1.0).unwrap();
        series.append(2 * SEC, 2.0).unwrap();

        let latest = series.latest().unwrap();
        assert_eq!(latest.timestamp, 2 * SEC);
        assert_eq!(latest.value, 2.0);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_eviction_keeps_horizon() {
        let series = BoundedSeries::new(Duration::from_secs(1200));

        // One sample every 100 s across 1300 s.
        for i in 0..=13 {
            series.append(i * 100 * SEC, ()).unwrap();
        }

        let snapshot = series.snapshot();
        let latest = snapshot.last().unwrap().timestamp;
        assert!(snapshot.iter().all(|s| s.timestamp >= latest - 1200 * SEC));
        // 0 s is gone, 100 s sits exactly on the boundary and stays.
        assert_eq!(snapshot.first().unwrap().timestamp, 100 * SEC);
    }

    #[test]
    fn test_earliest_evicted_only_past_horizon() {
        let series = BoundedSeries::new(Duration::from_secs(1200));
        series.append(0, ()).unwrap();
        series.append(1200 * SEC, ()).unwrap();
        assert_eq!(series.len(), 2);

        series.append(1300 * SEC, ()).unwrap();
        assert_eq!(series.first().unwrap().timestamp, 1200 * SEC);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let series = BoundedSeries::new(Duration::from_secs(10));
        series.append(5 * SEC, ()).unwrap();

        let err = series.append(4 * SEC, ()).unwrap_err();
        assert_eq!(
            err,
            SeriesError::OutOfOrder {
                timestamp: 4 * SEC,
                latest: 5 * SEC
            }
        );
        assert_eq!(series.len(), 1);

        // Equal timestamps are fine.
        series.append(5 * SEC, ()).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_snapshot_since() {
        let series = BoundedSeries::new(Duration::from_secs(100));
        for i in 0..10 {
            series.append(i * SEC, i).unwrap();
        }

        let tail = series.snapshot_since(7 * SEC);
        let values: Vec<i64> = tail.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![7, 8, 9]);
        assert!(series.snapshot_since(20 * SEC).is_empty());
    }

    #[test]
    fn test_clear() {
        let series = BoundedSeries::new(Duration::from_secs(10));
        series.append(SEC, ()).unwrap();
        series.clear();
        assert!(series.is_empty());
        assert!(series.first().is_none());
    }

    #[test]
    fn test_concurrent_readers_see_whole_appends() {
        let series = Arc::new(BoundedSeries::new(Duration::from_secs(5)));
        let writer = {
            let series = Arc::clone(&series);
            thread::spawn(move || {
                for i in 0..5_000 {
                    series.append(i * 10_000_000, i).unwrap();
                }
            })
        };

        for _ in 0..200 {
            let snapshot = series.snapshot();
            assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            if let Some(last) = snapshot.last() {
                let cutoff = last.timestamp - 5 * SEC;
                assert!(snapshot.iter().all(|s| s.timestamp >= cutoff));
            }
        }

        writer.join().unwrap();
        assert_eq!(series.latest().unwrap().value, 4_999);
    }
}
