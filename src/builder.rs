//! Builder for query caches.
//!
//! Collects the capacity and value destructor, then produces either a
//! thread-safe [`QueryCache`] or a bare [`CacheCore`] for single-threaded use.
//!
//! ## Example
//!
//! ```rust
//! use querycache::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::<String>::new(100).build();
//! let _ = cache.put("MATCH (n) RETURN n", "rows".to_string());
//! assert_eq!(cache.get("MATCH (n) RETURN n").as_deref(), Some("rows"));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheCore, QueryCache};
use crate::error::ConfigError;
use crate::traits::{Destructor, DropDestructor};

/// Builder for creating cache instances.
pub struct CacheBuilder<V> {
    capacity: usize,
    destructor: Arc<dyn Destructor<V>>,
}

impl<V> CacheBuilder<V> {
    /// Create a new cache builder with the specified capacity. Values are
    /// destroyed by dropping them unless [`destructor`](Self::destructor) is
    /// called.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            destructor: Arc::new(DropDestructor),
        }
    }

    /// Sets the capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the function invoked on every value the cache lets go of.
    pub fn destructor<D>(mut self, destructor: D) -> Self
    where
        D: Destructor<V> + 'static,
    {
        self.destructor = Arc::new(destructor);
        self
    }

    /// Shares a destructor already held elsewhere (e.g. by a registry).
    pub fn shared_destructor(mut self, destructor: Arc<dyn Destructor<V>>) -> Self {
        self.destructor = destructor;
        self
    }

    /// Build a thread-safe cache. A capacity of 0 yields a cache that rejects
    /// every `put`; use [`try_build`](Self::try_build) to refuse it instead.
    pub fn build(self) -> QueryCache<V> {
        QueryCache::with_shared_destructor(self.capacity, self.destructor)
    }

    /// Build a thread-safe cache, rejecting a zero capacity.
    ///
    /// # Example
    ///
    /// ```rust
    /// use querycache::builder::CacheBuilder;
    ///
    /// assert!(CacheBuilder::<u64>::new(0).try_build().is_err());
    /// assert!(CacheBuilder::<u64>::new(8).try_build().is_ok());
    /// ```
    pub fn try_build(self) -> Result<QueryCache<V>, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::zero_capacity("query cache"));
        }
        Ok(self.build())
    }

    /// Build the unsynchronized core.
    pub fn build_core(self) -> CacheCore<V> {
        CacheCore::new(self.capacity, self.destructor)
    }
}

impl<V> fmt::Debug for CacheBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
