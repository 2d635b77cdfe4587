//! # Metrics Traits
//!
//! Recording, snapshotting and export are split into separate traits so the
//! cache only ever writes counters, while monitoring code only ever reads
//! them.
//!
//! ```text
//!   QueryCache ──record_*──► CacheMetricsRecorder (CacheMetrics, atomics)
//!                                     │
//!                                     ▼
//!   MetricsSnapshotProvider<S> ──► CacheMetricsSnapshot ──► MetricsExporter<S>
//!   (tests / benches / ops)          (Copy, plain data)       (Prometheus text)
//! ```
//!
//! The recorder takes `&self`: `get` runs under a shared lock, so hit/miss
//! counters must tolerate concurrent writers.

/// Counters for one cache.
pub trait CacheMetricsRecorder {
    fn record_get_hit(&self);
    fn record_get_miss(&self);
    fn record_put_new(&self);
    fn record_put_replaced(&self);
    fn record_put_rejected(&self);
    fn record_evicted_entry(&self);
    fn record_remove_call(&self);
    fn record_remove_found(&self);
    fn record_invalidate(&self);
    fn record_clear(&self);
    fn record_destroyed(&self, count: u64);
}

/// Produces a point-in-time copy of a component's metrics.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Publishes snapshots to a monitoring system.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
