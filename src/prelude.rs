pub use crate::builder::CacheBuilder;
pub use crate::cache::{CacheCore, PutOutcome, QueryCache};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::fingerprint::{CacheKey, Fingerprint, fingerprint};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
pub use crate::metrics::traits::MetricsSnapshotProvider;
pub use crate::registry::{CacheHandle, CacheRegistry, RegistryBuilder};
pub use crate::traits::{Destructor, DropDestructor};
