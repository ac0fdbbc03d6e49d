//! Pool statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time snapshot of pool counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub created: u64,
    pub closed: u64,
    pub borrows: u64,
    pub total_wait_ms: u64,
    pub timeouts: u64,
    pub idle_expired: u64,
    pub discarded: u64,
}

impl PoolStats {
    /// Resources currently alive (idle or on loan)
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.closed)
    }

    pub fn avg_wait_ms(&self) -> f64 {
        if self.borrows == 0 {
            0.0
        } else {
            self.total_wait_ms as f64 / self.borrows as f64
        }
    }
}

/// Lock-free counters, updated with `Relaxed` ordering
#[derive(Debug, Default)]
pub(crate) struct AtomicPoolStats {
    created: AtomicU64,
    closed: AtomicU64,
    borrows: AtomicU64,
    total_wait_ms: AtomicU64,
    timeouts: AtomicU64,
    idle_expired: AtomicU64,
    discarded: AtomicU64,
}

impl AtomicPoolStats {
    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_borrow(&self, waited: Duration) {
        self.borrows.fetch_add(1, Ordering::Relaxed);
        self.total_wait_ms
            .fetch_add(waited.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_idle_expired(&self) {
        self.idle_expired.fetch_add(1, Ordering::Relaxed);
        self.record_closed();
    }

    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        self.record_closed();
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            borrows: self.borrows.load(Ordering::Relaxed),
            total_wait_ms: self.total_wait_ms.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            idle_expired: self.idle_expired.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
