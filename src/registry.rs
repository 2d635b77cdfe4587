//! Per-namespace cache registry.
//!
//! Maps a namespace (typically a graph name) to the [`QueryCache`] holding
//! that namespace's query results. Caches are created lazily on first
//! reference and torn down explicitly when the namespace goes away.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────┐
//!   │                        CacheRegistry<V>                           │
//!   │                                                                   │
//!   │   RwLock<FxHashMap<String, CacheHandle<V>>>                       │
//!   │   ┌──────────────┬──────────────────────────────┐                 │
//!   │   │ "social"     │ Arc<QueryCache<V>> (cap 1024)│                 │
//!   │   │ "payments"   │ Arc<QueryCache<V>> (cap 64)  │◄── override     │
//!   │   └──────────────┴──────────────────────────────┘                 │
//!   │                                                                   │
//!   │   default_capacity, capacity overrides, shared Destructor         │
//!   └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! The registry lock guards only the name → handle map. It is held just long
//! enough to look up, insert or detach a handle and is always released before
//! any cache lock is taken, so the two never nest.
//!
//! `get_or_create` is an atomic upsert: the read lock serves the common
//! case; on a miss the write lock is taken and the map entry is created in
//! place, so concurrent first references to a namespace all receive the same
//! cache.
//!
//! ## Removal
//!
//! Handles are `Arc`s, so a caller may still hold one when its namespace is
//! removed. [`CacheRegistry::remove`] therefore tears the detached cache
//! down (every value destroyed, cache left invalid) rather than relying on
//! the last handle to drop it: stale holders see misses and rejected puts.
//!
//! ## Example
//!
//! ```
//! use querycache::registry::CacheRegistry;
//!
//! let registry: CacheRegistry<Vec<u64>> = CacheRegistry::new(128);
//! let social = registry.get_or_create("social");
//! let _ = social.put("MATCH (p:Person) RETURN count(p)", vec![3]);
//!
//! let again = registry.get_or_create("social");
//! assert_eq!(again.get("MATCH (p:Person) RETURN count(p)"), Some(vec![3]));
//!
//! assert!(registry.remove("social"));
//! assert!(!social.is_valid());
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::builder::CacheBuilder;
use crate::cache::QueryCache;
use crate::error::ConfigError;
use crate::traits::{Destructor, DropDestructor};

/// Shared reference to one namespace's cache.
pub type CacheHandle<V> = Arc<QueryCache<V>>;

/// Owns one [`QueryCache`] per namespace.
pub struct CacheRegistry<V> {
    caches: RwLock<FxHashMap<String, CacheHandle<V>>>,
    default_capacity: usize,
    capacity_overrides: FxHashMap<String, usize>,
    destructor: Arc<dyn Destructor<V>>,
}

impl<V> CacheRegistry<V> {
    /// Creates a registry whose caches hold `default_capacity` entries and
    /// drop evicted values.
    pub fn new(default_capacity: usize) -> Self {
        RegistryBuilder::new(default_capacity).build()
    }

    pub fn builder(default_capacity: usize) -> RegistryBuilder<V> {
        RegistryBuilder::new(default_capacity)
    }

    /// Returns the namespace's cache, creating it on first reference.
    pub fn get_or_create(&self, namespace: &str) -> CacheHandle<V> {
        if let Some(cache) = self.caches.read().get(namespace) {
            return Arc::clone(cache);
        }

        let mut caches = self.caches.write();
        let cache = caches.entry(namespace.to_owned()).or_insert_with(|| {
            let capacity = self.capacity_for(namespace);
            debug!(namespace, capacity, "created namespace cache");
            Arc::new(
                CacheBuilder::new(capacity)
                    .shared_destructor(Arc::clone(&self.destructor))
                    .build(),
            )
        });
        Arc::clone(cache)
    }

    /// Returns the namespace's cache without creating one.
    pub fn get(&self, namespace: &str) -> Option<CacheHandle<V>> {
        self.caches.read().get(namespace).cloned()
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.caches.read().contains_key(namespace)
    }

    /// Number of namespaces with a live cache.
    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.read().is_empty()
    }

    /// Namespace names, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Capacity a cache for `namespace` is (or would be) created with.
    pub fn capacity_for(&self, namespace: &str) -> usize {
        self.capacity_overrides
            .get(namespace)
            .copied()
            .unwrap_or(self.default_capacity)
    }

    /// Detaches the namespace's cache and destroys its values. Returns
    /// `false` if the namespace had no cache.
    pub fn remove(&self, namespace: &str) -> bool {
        let detached = self.caches.write().remove(namespace);
        let Some(cache) = detached else {
            return false;
        };

        let destroyed = cache.teardown();
        debug!(namespace, destroyed, "removed namespace cache");
        true
    }

    /// Moves the cache for `from` to `to`, keeping its contents. Returns
    /// `false` if `from` has no cache or `to` already has one.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut caches = self.caches.write();
        if caches.contains_key(to) {
            return false;
        }
        let Some(cache) = caches.remove(from) else {
            return false;
        };
        caches.insert(to.to_owned(), cache);
        drop(caches);

        debug!(from, to, "renamed namespace cache");
        true
    }

    /// Invalidates the namespace's cache. Returns `false` if it has none.
    pub fn invalidate(&self, namespace: &str) -> bool {
        match self.get(namespace) {
            Some(cache) => {
                cache.invalidate();
                true
            },
            None => false,
        }
    }

    /// Clears the namespace's cache, returning the number of values
    /// destroyed, or `None` if it has no cache.
    pub fn clear(&self, namespace: &str) -> Option<usize> {
        self.get(namespace).map(|cache| cache.clear())
    }

    /// Invalidates every cache.
    pub fn invalidate_all(&self) {
        for cache in self.handles() {
            cache.invalidate();
        }
    }

    /// Clears every cache, returning the total number of values destroyed.
    pub fn clear_all(&self) -> usize {
        self.handles().iter().map(|cache| cache.clear()).sum()
    }

    fn handles(&self) -> Vec<CacheHandle<V>> {
        self.caches.read().values().cloned().collect()
    }
}

impl<V> fmt::Debug for CacheRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("namespaces", &self.len())
            .field("default_capacity", &self.default_capacity)
            .field("capacity_overrides", &self.capacity_overrides)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CacheRegistry`].
///
/// ```
/// use querycache::registry::RegistryBuilder;
///
/// let registry = RegistryBuilder::<String>::new(256)
///     .namespace_capacity("audit", 16)
///     .try_build()
///     .unwrap();
/// assert_eq!(registry.get_or_create("audit").capacity(), 16);
/// assert_eq!(registry.get_or_create("social").capacity(), 256);
/// ```
pub struct RegistryBuilder<V> {
    default_capacity: usize,
    capacity_overrides: FxHashMap<String, usize>,
    destructor: Arc<dyn Destructor<V>>,
}

impl<V> RegistryBuilder<V> {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            default_capacity,
            capacity_overrides: FxHashMap::default(),
            destructor: Arc::new(DropDestructor),
        }
    }

    /// Sets the destructor shared by every cache the registry creates.
    pub fn destructor<D>(mut self, destructor: D) -> Self
    where
        D: Destructor<V> + 'static,
    {
        self.destructor = Arc::new(destructor);
        self
    }

    /// Overrides the capacity for one namespace.
    pub fn namespace_capacity(mut self, namespace: impl Into<String>, capacity: usize) -> Self {
        self.capacity_overrides.insert(namespace.into(), capacity);
        self
    }

    pub fn build(self) -> CacheRegistry<V> {
        CacheRegistry {
            caches: RwLock::new(FxHashMap::default()),
            default_capacity: self.default_capacity,
            capacity_overrides: self.capacity_overrides,
            destructor: self.destructor,
        }
    }

    /// Like [`build`](Self::build), but rejects zero capacities.
    pub fn try_build(self) -> Result<CacheRegistry<V>, ConfigError> {
        if self.default_capacity == 0 {
            return Err(ConfigError::zero_capacity("registry default"));
        }
        if let Some((namespace, _)) = self.capacity_overrides.iter().find(|(_, cap)| **cap == 0) {
            return Err(ConfigError::zero_capacity(&format!("namespace {namespace:?}")));
        }
        Ok(self.build())
    }
}

impl<V> fmt::Debug for RegistryBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("default_capacity", &self.default_capacity)
            .field("capacity_overrides", &self.capacity_overrides)
            .finish_non_exhaustive()
    }
}
