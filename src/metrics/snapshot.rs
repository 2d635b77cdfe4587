/// Point-in-time view of a cache's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,

    pub put_calls: u64,
    pub put_new: u64,
    pub put_replaced: u64,
    pub put_rejected: u64, // invalid cache or zero capacity

    pub evicted_entries: u64,
    pub remove_calls: u64,
    pub remove_found: u64,

    pub invalidate_calls: u64,
    pub clear_calls: u64,
    pub destroyed_values: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub capacity: usize,
    pub valid: bool,
}

impl CacheMetricsSnapshot {
    /// Fraction of `get` calls that hit, or `0.0` before the first call.
    pub fn hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.get_calls as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_handles_zero_calls() {
        let snap = CacheMetricsSnapshot::default();
        assert_eq!(snap.hit_ratio(), 0.0);

        let snap = CacheMetricsSnapshot {
            get_calls: 4,
            get_hits: 3,
            get_misses: 1,
            ..Default::default()
        };
        assert!((snap.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
