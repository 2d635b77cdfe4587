//! querycache: a bounded strict-LRU cache for query results, keyed by
//! fingerprints of the query text, with a per-namespace registry.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;
pub mod fingerprint;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod registry;
pub mod traits;
