pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::CacheMetrics;
pub use snapshot::CacheMetricsSnapshot;
pub use traits::{CacheMetricsRecorder, MetricsExporter, MetricsSnapshotProvider};
