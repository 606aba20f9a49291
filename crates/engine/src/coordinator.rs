//! Transaction coordinator for write transaction lifecycle
//!
//! The engine allows one write transaction at a time. The coordinator owns
//! the writer lock that serializes them and keeps lifecycle metrics
//! (started, committed, aborted).
//!
//! The writer lock is held from `begin_write` until the transaction's
//! change events are published, so the feed sees events in commit order.

use parking_lot::{Mutex as ParkingMutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Write transaction coordinator for the database
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are purely observational
/// and do not synchronize any other memory operations.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    writer: ParkingMutex<()>,
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
}

impl TransactionCoordinator {
    /// Create a coordinator with zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the writer lock, waiting for the in-flight writer
    pub fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }

    /// Record transaction start
    pub fn record_start(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record transaction commit
    pub fn record_commit(&self) {
        self.saturating_decrement_active();
        let committed = self.total_committed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(target: "suitestore::txn", committed, "Transaction committed");
    }

    /// Record transaction abort
    pub fn record_abort(&self) {
        self.saturating_decrement_active();
        let aborted = self.total_aborted.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(target: "suitestore::txn", aborted, "Transaction aborted");
    }

    fn saturating_decrement_active(&self) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }

    /// Get transaction metrics
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }
}

/// Transaction metrics
#[derive(Debug, Clone)]
pub struct TransactionMetrics {
    /// Number of currently active write transactions (0 or 1)
    pub active_count: u64,
    /// Total number of write transactions started
    pub total_started: u64,
    /// Total number of write transactions committed
    pub total_committed: u64,
    /// Total number of write transactions aborted
    pub total_aborted: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Total transactions that completed (committed + aborted)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted
    }

    /// Abort rate (aborted / started)
    pub fn abort_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_aborted as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_coordinator_new() {
        let metrics = TransactionCoordinator::new().metrics();
        assert_eq!(metrics.active_count, 0);
        assert_eq!(metrics.total_started, 0);
        assert_eq!(metrics.total_committed, 0);
        assert_eq!(metrics.total_aborted, 0);
        assert_eq!(metrics.commit_rate, 0.0);
    }

    #[test]
    fn test_metrics_track_lifecycle() {
        let coordinator = TransactionCoordinator::new();
        coordinator.record_start();
        assert_eq!(coordinator.metrics().active_count, 1);
        coordinator.record_commit();
        coordinator.record_start();
        coordinator.record_abort();

        let metrics = coordinator.metrics();
        assert_eq!(metrics.active_count, 0);
        assert_eq!(metrics.total_started, 2);
        assert_eq!(metrics.total_completed(), 2);
        assert_eq!(metrics.commit_rate, 0.5);
        assert_eq!(metrics.abort_rate(), 0.5);
    }

    #[test]
    fn test_active_count_saturates() {
        let coordinator = TransactionCoordinator::new();
        coordinator.record_abort();
        assert_eq!(coordinator.metrics().active_count, 0);
    }

    #[test]
    fn test_writer_lock_is_exclusive() {
        let coordinator = Arc::new(TransactionCoordinator::new());
        let guard = coordinator.lock_writer();

        let other = Arc::clone(&coordinator);
        let handle = std::thread::spawn(move || other.writer.try_lock().is_none());
        assert!(handle.join().unwrap());
        drop(guard);
        assert!(coordinator.writer.try_lock().is_some());
    }
}
