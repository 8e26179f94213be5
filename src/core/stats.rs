//! Delivery statistics
//!
//! Counters shared between producers and worker threads. Every counter only
//! grows; `buffered` is not stored here but derived from queue occupancy when
//! a snapshot is taken.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic delivery counters
///
/// # Example
///
/// ```
/// use rust_cloud_logger::core::StatsRegistry;
///
/// let stats = StatsRegistry::new();
/// stats.record_delivered(3);
/// stats.record_dropped();
///
/// let status = stats.snapshot(0);
/// assert_eq!(status.delivered, 3);
/// assert_eq!(status.dropped, 1);
/// ```
#[derive(Debug, Default)]
pub struct StatsRegistry {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    retried: AtomicU64,
}

impl StatsRegistry {
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            retried: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::Relaxed)
    }

    /// Add `records` to the delivered count, returning the previous value
    #[inline]
    pub fn record_delivered(&self, records: u64) -> u64 {
        self.delivered.fetch_add(records, Ordering::Relaxed)
    }

    /// Add `records` to the failed count, returning the previous value
    #[inline]
    pub fn record_failed(&self, records: u64) -> u64 {
        self.failed.fetch_add(records, Ordering::Relaxed)
    }

    /// Record one entry rejected at admission, returning the previous value
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    /// Record one retry attempt, returning the previous value
    #[inline]
    pub fn record_retry(&self) -> u64 {
        self.retried.fetch_add(1, Ordering::Relaxed)
    }

    /// Point-in-time snapshot with the given queue occupancy
    pub fn snapshot(&self, buffered: u64) -> DeliveryStatus {
        DeliveryStatus {
            buffered,
            delivered: self.delivered(),
            failed: self.failed(),
            dropped: self.dropped(),
            retried: self.retried(),
        }
    }
}

/// Snapshot of a deliverer's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Entries currently waiting in the queue
    pub buffered: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Entries rejected because the queue was full
    pub dropped: u64,
    pub retried: u64,
}

impl DeliveryStatus {
    /// Drop rate as a percentage (0.0 - 100.0) of all entries offered
    ///
    /// Returns 0.0 if nothing has been offered yet.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped as f64;
        let total = (self.buffered + self.delivered + self.failed) as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buffered={} delivered={} failed={} dropped={} retried={}",
            self.buffered, self.delivered, self.failed, self.dropped, self.retried
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_returns_previous_value() {
        let stats = StatsRegistry::new();
        assert_eq!(stats.record_dropped(), 0);
        assert_eq!(stats.record_dropped(), 1);
        assert_eq!(stats.record_delivered(10), 0);
        assert_eq!(stats.record_delivered(5), 10);
        assert_eq!(stats.delivered(), 15);
    }

    #[test]
    fn test_snapshot_uses_given_buffered() {
        let stats = StatsRegistry::new();
        stats.record_failed(2);
        stats.record_retry();

        let status = stats.snapshot(7);
        assert_eq!(
            status,
            DeliveryStatus {
                buffered: 7,
                delivered: 0,
                failed: 2,
                dropped: 0,
                retried: 1,
            }
        );
    }

    #[test]
    fn test_drop_rate() {
        assert_eq!(DeliveryStatus::default().drop_rate(), 0.0);

        let status = DeliveryStatus {
            delivered: 90,
            dropped: 10,
            ..Default::default()
        };
        assert!((status.drop_rate() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_display() {
        let status = DeliveryStatus {
            buffered: 1,
            delivered: 2,
            failed: 3,
            dropped: 4,
            retried: 5,
        };
        assert_eq!(
            status.to_string(),
            "buffered=1 delivered=2 failed=3 dropped=4 retried=5"
        );
    }

    #[test]
    fn test_concurrent_updates() {
        let stats = Arc::new(StatsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_delivered(1);
                        stats.record_dropped();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.delivered(), 4000);
        assert_eq!(stats.dropped(), 4000);
    }
}
