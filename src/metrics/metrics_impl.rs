use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::CacheMetricsRecorder;

/// Live counters for a [`QueryCache`](crate::cache::QueryCache).
///
/// Counters are monotonic across `invalidate` and `clear`; only the gauges in
/// a snapshot reflect the current contents.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub get_calls: AtomicU64,
    pub get_hits: AtomicU64,
    pub get_misses: AtomicU64,
    pub put_calls: AtomicU64,
    pub put_new: AtomicU64,
    pub put_replaced: AtomicU64,
    pub put_rejected: AtomicU64,
    pub evicted_entries: AtomicU64,
    pub remove_calls: AtomicU64,
    pub remove_found: AtomicU64,
    pub invalidate_calls: AtomicU64,
    pub clear_calls: AtomicU64,
    pub destroyed_values: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl CacheMetrics {
    /// Copies the counters; gauges are left at their defaults for the
    /// caller to fill in.
    pub fn counters(&self) -> CacheMetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheMetricsSnapshot {
            get_calls: load(&self.get_calls),
            get_hits: load(&self.get_hits),
            get_misses: load(&self.get_misses),
            put_calls: load(&self.put_calls),
            put_new: load(&self.put_new),
            put_replaced: load(&self.put_replaced),
            put_rejected: load(&self.put_rejected),
            evicted_entries: load(&self.evicted_entries),
            remove_calls: load(&self.remove_calls),
            remove_found: load(&self.remove_found),
            invalidate_calls: load(&self.invalidate_calls),
            clear_calls: load(&self.clear_calls),
            destroyed_values: load(&self.destroyed_values),
            ..CacheMetricsSnapshot::default()
        }
    }
}

impl CacheMetricsRecorder for CacheMetrics {
    fn record_get_hit(&self) {
        bump(&self.get_calls);
        bump(&self.get_hits);
    }

    fn record_get_miss(&self) {
        bump(&self.get_calls);
        bump(&self.get_misses);
    }

    fn record_put_new(&self) {
        bump(&self.put_calls);
        bump(&self.put_new);
    }

    fn record_put_replaced(&self) {
        bump(&self.put_calls);
        bump(&self.put_replaced);
    }

    fn record_put_rejected(&self) {
        bump(&self.put_calls);
        bump(&self.put_rejected);
    }

    fn record_evicted_entry(&self) {
        bump(&self.evicted_entries);
    }

    fn record_remove_call(&self) {
        bump(&self.remove_calls);
    }

    fn record_remove_found(&self) {
        bump(&self.remove_found);
    }

    fn record_invalidate(&self) {
        bump(&self.invalidate_calls);
    }

    fn record_clear(&self) {
        bump(&self.clear_calls);
    }

    fn record_destroyed(&self, count: u64) {
        self.destroyed_values.fetch_add(count, Ordering::Relaxed);
    }
}
