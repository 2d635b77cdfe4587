//! Error types for the querycache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache or registry configuration is
//!   invalid (e.g. zero capacity).
//! - [`InvariantError`]: Returned by `check_invariants` when the pool, the
//!   recency list and the index disagree about the live entries.
//!
//! The cache's hot path (`get` / `put` / `remove`) never returns an error: a
//! miss, an eviction or an invalidated cache are all ordinary outcomes.
//!
//! ## Example Usage
//!
//! ```
//! use querycache::builder::CacheBuilder;
//! use querycache::error::ConfigError;
//!
//! let cache = CacheBuilder::<u64>::new(128).try_build();
//! assert!(cache.is_ok());
//!
//! let bad: Result<_, ConfigError> = CacheBuilder::<u64>::new(0).try_build();
//! assert!(bad.unwrap_err().to_string().contains("capacity"));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by [`CacheCore::check_invariants`](crate::cache::CacheCore::check_invariants)
/// and [`QueryCache::check_invariants`](crate::cache::QueryCache::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build),
/// [`QueryCache::try_new`](crate::cache::QueryCache::try_new) and
/// [`RegistryBuilder::try_build`](crate::registry::RegistryBuilder::try_build).
///
/// # Example
///
/// ```
/// use querycache::cache::QueryCache;
///
/// let err = QueryCache::<u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }

    pub(crate) fn zero_capacity(what: &str) -> Self {
        Self(format!("{what}: capacity must be > 0"))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("index has 3 entries, recency list has 2");
        assert_eq!(err.to_string(), "index has 3 entries, recency list has 2");
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("slot 4 linked but vacant");
        assert_eq!(err.message(), "slot 4 linked but vacant");
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<InvariantError>();
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_zero_capacity_names_the_component() {
        let err = ConfigError::zero_capacity("namespace `social`");
        assert_eq!(err.to_string(), "namespace `social`: capacity must be > 0");
        assert!(err.message().contains("capacity"));
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<ConfigError>();
    }
}
