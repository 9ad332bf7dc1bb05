//! Monotonic time sources.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A clock that never goes backwards, in nanoseconds.
///
/// Sources and the analyzers fed by them must share one timeline; a tracker
/// fed with platform receipt times needs a clock reading the same platform
/// counter.
pub trait MonotonicClock: Send + Sync {
    fn now_ns(&self) -> i64;
}

/// Monotonic clock anchored at the first read in this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessClock;

static PROCESS_EPOCH: OnceLock<Instant> = OnceLock::new();

impl ProcessClock {
    /// Nanoseconds since the process epoch. Starts at 1 so a fresh reading is
    /// never mistaken for a missing timestamp.
    pub fn read() -> i64 {
        let epoch = PROCESS_EPOCH.get_or_init(Instant::now);
        i64::try_from(epoch.elapsed().as_nanos())
            .unwrap_or(i64::MAX)
            .saturating_add(1)
    }
}

impl MonotonicClock for ProcessClock {
    fn now_ns(&self) -> i64 {
        Self::read()
    }
}

/// Clock driven by hand, for replays and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ns: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ns),
        }
    }

    pub fn set(&self, now_ns: i64) {
        self.now.store(now_ns, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ns: i64) {
        self.now.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_ns(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_clock_is_monotonic() {
        let a = ProcessClock.now_ns();
        let b = ProcessClock.now_ns();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        clock.advance(50);
        assert_eq!(clock.now_ns(), 150);
        clock.set(7);
        assert_eq!(clock.now_ns(), 7);
    }
}
