//! Scan loop counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated over one scan session.
///
/// Incremented from the scan worker; readable from any thread.
#[derive(Debug, Default)]
pub struct ScanStats {
    ticks: AtomicU64,
    decoded: AtomicU64,
    misses: AtomicU64,
    capture_failures: AtomicU64,
}

impl ScanStats {
    /// Creates a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_capture_failure(&self) {
        self.capture_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Scan ticks that ran.
    pub ticks: u64,
    /// Ticks that decoded a symbol.
    pub decoded: u64,
    /// Ticks that captured a frame but found no symbol.
    pub misses: u64,
    /// Ticks abandoned because frame capture failed.
    pub capture_failures: u64,
}
