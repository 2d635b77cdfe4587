use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// Writes the Prometheus text exposition format so it can be scraped by
/// Prometheus or forwarded to an OpenTelemetry collector. Use one exporter
/// per namespace, with the namespace folded into the prefix.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", &self.metric_name(suffix), value);
    }

    fn write_gauge(&self, suffix: &str, value: u64) {
        self.write_metric("gauge", &self.metric_name(suffix), value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<CacheMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &CacheMetricsSnapshot) {
        self.write_counter("get_calls_total", snapshot.get_calls);
        self.write_counter("get_hits_total", snapshot.get_hits);
        self.write_counter("get_misses_total", snapshot.get_misses);
        self.write_counter("put_calls_total", snapshot.put_calls);
        self.write_counter("put_new_total", snapshot.put_new);
        self.write_counter("put_replaced_total", snapshot.put_replaced);
        self.write_counter("put_rejected_total", snapshot.put_rejected);
        self.write_counter("evicted_entries_total", snapshot.evicted_entries);
        self.write_counter("remove_calls_total", snapshot.remove_calls);
        self.write_counter("remove_found_total", snapshot.remove_found);
        self.write_counter("invalidate_calls_total", snapshot.invalidate_calls);
        self.write_counter("clear_calls_total", snapshot.clear_calls);
        self.write_counter("destroyed_values_total", snapshot.destroyed_values);
        self.write_gauge("cache_len", snapshot.cache_len as u64);
        self.write_gauge("capacity", snapshot.capacity as u64);
        self.write_gauge("valid", u64::from(snapshot.valid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporter_writes_prefixed_counters_and_gauges() {
        let exporter = PrometheusTextExporter::new("querycache_social", Vec::new());
        let snap = CacheMetricsSnapshot {
            get_calls: 5,
            get_hits: 4,
            get_misses: 1,
            cache_len: 2,
            capacity: 8,
            valid: true,
            ..Default::default()
        };
        exporter.export(&snap);

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE querycache_social_get_hits_total counter\n"));
        assert!(text.contains("querycache_social_get_hits_total 4\n"));
        assert!(text.contains("# TYPE querycache_social_cache_len gauge\n"));
        assert!(text.contains("querycache_social_capacity 8\n"));
        assert!(text.contains("querycache_social_valid 1\n"));
    }

    #[test]
    fn exporter_without_prefix_uses_bare_names() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&CacheMetricsSnapshot::default());
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.starts_with("# TYPE get_calls_total counter\nget_calls_total 0\n"));
        assert!(text.contains("valid 0\n"));
    }
}
