//! Writer statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time copy of a writer's counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkStats {
    /// Records accepted by `write`
    pub records_written: u64,
    /// Records that failed to bind or to be added to the batch
    pub records_rejected: u64,
    /// Records in successfully executed batches
    pub records_flushed: u64,
    /// Records in batches whose execution failed
    pub records_failed: u64,
    /// Successfully executed batches
    pub batches_flushed: u64,
    /// Batches whose execution failed
    pub batches_failed: u64,
    /// Time spent executing batches (milliseconds)
    pub total_flush_time_ms: u64,
    /// Flushed records per second of execution time
    pub records_per_second: f64,
}

/// Counters updated by a writer and readable from other tasks
#[derive(Debug, Default)]
#[allow(missing_docs)]
pub struct AtomicSinkStats {
    pub records_written: AtomicU64,
    pub records_rejected: AtomicU64,
    pub records_flushed: AtomicU64,
    pub records_failed: AtomicU64,
    pub batches_flushed: AtomicU64,
    pub batches_failed: AtomicU64,
    pub total_flush_time_ms: AtomicU64,
}

impl AtomicSinkStats {
    /// Record a record added to the batch
    pub fn record_write(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record that could not be added
    pub fn record_rejection(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful batch
    pub fn record_flush(&self, records: u64, duration: Duration) {
        self.records_flushed.fetch_add(records, Ordering::Relaxed);
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.total_flush_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record a failed batch
    pub fn record_flush_failure(&self, records: u64) {
        self.records_failed.fetch_add(records, Ordering::Relaxed);
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot
    pub fn snapshot(&self) -> SinkStats {
        let flushed = self.records_flushed.load(Ordering::Relaxed);
        let time_ms = self.total_flush_time_ms.load(Ordering::Relaxed);
        let rps = if time_ms > 0 {
            (flushed as f64 * 1000.0) / time_ms as f64
        } else {
            0.0
        };

        SinkStats {
            records_written: self.records_written.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            records_flushed: flushed,
            records_failed: self.records_failed.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            total_flush_time_ms: time_ms,
            records_per_second: rps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_sink_stats() {
        let stats = AtomicSinkStats::default();

        for _ in 0..150 {
            stats.record_write();
        }
        stats.record_rejection();
        stats.record_flush(100, Duration::from_millis(200));
        stats.record_flush(50, Duration::from_millis(100));
        stats.record_flush_failure(5);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.records_written, 150);
        assert_eq!(snapshot.records_rejected, 1);
        assert_eq!(snapshot.records_flushed, 150);
        assert_eq!(snapshot.batches_flushed, 2);
        assert_eq!(snapshot.records_failed, 5);
        assert_eq!(snapshot.batches_failed, 1);
        assert_eq!(snapshot.total_flush_time_ms, 300);
        assert_eq!(snapshot.records_per_second, 500.0);
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(AtomicSinkStats::default().snapshot(), SinkStats::default());
    }
}
