//! # Query Result Cache
//!
//! A bounded, strict-LRU cache addressed by key [`Fingerprint`]s, used to
//! avoid re-running identical queries against the same graph.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          QueryCache<V>                               │
//!   │                                                                      │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │                   RwLock<CacheCore<V>>                       │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   │                               │                                      │
//!   │                               ▼                                      │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │                      CacheCore<V>                            │   │
//!   │   │                                                              │   │
//!   │   │   FingerprintIndex      Fingerprint ──► SlotId               │   │
//!   │   │                                                              │   │
//!   │   │   Mutex<RecencyList>    head ─► [3] ◄─► [0] ◄─► [1] ◄─ tail  │   │
//!   │   │                               (MRU)             (LRU)        │   │
//!   │   │                                                              │   │
//!   │   │   SlotPool<V>           [ v0 | v1 | ·· | v3 | ······ ]       │   │
//!   │   │                           fixed array, bump + free list      │   │
//!   │   │                                                              │   │
//!   │   │   valid: bool           Valid ◄── clear()                    │   │
//!   │   │                         Invalid ◄── invalidate()             │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Method          | Lock   | Effect                                              |
//! |-----------------|--------|-----------------------------------------------------|
//! | `get_with(k,f)` | Read   | Hit: promote to MRU, run `f` on the value            |
//! | `get(k)`        | Read   | As `get_with`, cloning the value out                |
//! | `peek_with(k,f)`| Read   | Hit without promotion                               |
//! | `contains(k)`   | Read   | Presence check without promotion                    |
//! | `put(k, v)`     | Write  | Insert (evicting the LRU entry if full) or replace  |
//! | `remove(k)`     | Write  | Unlink, unindex, destroy                            |
//! | `invalidate()`  | Write  | Flip to `Invalid`; O(1), values untouched           |
//! | `clear()`       | Write  | Destroy all values, reset state, flip to `Valid`    |
//!
//! While `Invalid`, every read reports a miss and every `put` hands the value
//! back as [`PutOutcome::Rejected`]. A graph writer calls `invalidate()` before
//! a change that could make cached results stale and `clear()` once it is
//! done.
//!
//! ## Concurrency Model
//!
//! ```text
//!   Thread 1           Thread 2           Thread 3
//!      │ get(q1)          │ get(q2)          │ put(q3)
//!      ▼                  ▼                  ▼
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ RwLock: get() shares the read lock; put/remove/clear/    │
//!   │ invalidate take the write lock and exclude everyone.     │
//!   └──────────────────────────────────────────────────────────┘
//!      │                  │
//!      ▼                  ▼
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ Mutex<RecencyList>: readers serialize only for the O(1)  │
//!   │ move_to_front splice; writers use get_mut() (no lock).   │
//!   └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Value destruction happens inside the write lock, so a slow destructor on
//! the eviction path stalls concurrent readers.
//!
//! The reference handed to `get_with`'s closure is only valid while the read
//! lock is held; use `get` to clone the value out.
//!
//! ## Example Usage
//!
//! ```
//! use querycache::cache::{PutOutcome, QueryCache};
//!
//! let cache: QueryCache<Vec<u64>> = QueryCache::new(2);
//! assert_eq!(cache.put("MATCH (a) RETURN a", vec![1, 2]), PutOutcome::Inserted { evicted: false });
//! assert_eq!(cache.get("MATCH (a) RETURN a"), Some(vec![1, 2]));
//!
//! cache.invalidate();
//! assert_eq!(cache.get("MATCH (a) RETURN a"), None);
//!
//! cache.clear();
//! assert!(cache.is_valid());
//! assert!(cache.is_empty());
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace};

use crate::ds::{FingerprintIndex, RecencyList, SlotId, SlotPool};
use crate::error::{ConfigError, InvariantError};
use crate::fingerprint::{CacheKey, Fingerprint};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::CacheMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{CacheMetricsRecorder, MetricsSnapshotProvider};
use crate::traits::{Destructor, DropDestructor};

/// Result of [`QueryCache::put`] / [`CacheCore::put`].
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome<V> {
    /// Stored in a fresh slot; `evicted` is set if the LRU entry was
    /// destroyed to make room.
    Inserted { evicted: bool },
    /// The fingerprint was already cached; the old value was destroyed and
    /// the entry promoted to MRU.
    Replaced,
    /// The cache is invalid or has zero capacity. Ownership was never
    /// accepted, so the value is handed back.
    Rejected(V),
}

impl<V> PutOutcome<V> {
    /// Returns `true` if the cache took ownership of the value.
    pub fn is_stored(&self) -> bool {
        !matches!(self, PutOutcome::Rejected(_))
    }

    /// Returns the value if it was rejected.
    pub fn into_rejected(self) -> Option<V> {
        match self {
            PutOutcome::Rejected(value) => Some(value),
            _ => None,
        }
    }
}

/// Single-threaded cache orchestration: slot pool + recency list + index.
///
/// `get` takes `&self` and promotes through an internal mutex around the
/// recency list, which is what lets [`QueryCache`] serve reads under a shared
/// lock. All other mutation takes `&mut self`.
pub struct CacheCore<V> {
    pool: SlotPool<V>,
    recency: Mutex<RecencyList>,
    index: FingerprintIndex,
    capacity: usize,
    valid: bool,
    #[cfg(feature = "metrics")]
    metrics: CacheMetrics,
}

impl<V> CacheCore<V> {
    /// Creates a cache holding at most `capacity` values. A capacity of 0
    /// creates a cache that rejects every `put`.
    pub fn new(capacity: usize, destructor: Arc<dyn Destructor<V>>) -> Self {
        Self {
            pool: SlotPool::new(capacity, destructor),
            recency: Mutex::new(RecencyList::new(capacity)),
            index: FingerprintIndex::with_capacity(capacity),
            capacity,
            valid: true,
            #[cfg(feature = "metrics")]
            metrics: CacheMetrics::default(),
        }
    }

    /// Looks up `key`, promoting it to MRU on a hit.
    pub fn get<K: CacheKey + ?Sized>(&self, key: &K) -> Option<&V> {
        let Some(id) = self.lookup(key) else {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
            return None;
        };

        #[cfg(feature = "metrics")]
        self.metrics.record_get_hit();

        self.recency.lock().move_to_front(id);
        self.pool.value_at(id)
    }

    /// Looks up `key` without touching recency.
    pub fn peek<K: CacheKey + ?Sized>(&self, key: &K) -> Option<&V> {
        self.lookup(key).and_then(|id| self.pool.value_at(id))
    }

    /// Returns `true` if `key` is cached and the cache is valid.
    pub fn contains<K: CacheKey + ?Sized>(&self, key: &K) -> bool {
        self.lookup(key).is_some()
    }

    fn lookup<K: CacheKey + ?Sized>(&self, key: &K) -> Option<SlotId> {
        if !self.valid {
            return None;
        }
        self.index.lookup(key.fingerprint())
    }

    /// Stores `value` under `key`.
    ///
    /// An existing entry for the same fingerprint is replaced (its old value
    /// destroyed) and promoted. Otherwise, if the cache is full, the LRU entry
    /// is evicted first.
    ///
    /// # Panics
    ///
    /// Panics if the slot pool has no vacant slot after eviction, which means
    /// the pool/index/recency bookkeeping is corrupt.
    pub fn put<K: CacheKey + ?Sized>(&mut self, key: &K, value: V) -> PutOutcome<V> {
        if !self.valid || self.capacity == 0 {
            #[cfg(feature = "metrics")]
            self.metrics.record_put_rejected();
            return PutOutcome::Rejected(value);
        }

        let fingerprint = key.fingerprint();
        if let Some(id) = self.index.lookup(fingerprint) {
            self.recency.get_mut().move_to_front(id);
            self.pool.replace_value(id, value);
            #[cfg(feature = "metrics")]
            {
                self.metrics.record_put_replaced();
                self.metrics.record_destroyed(1);
            }
            return PutOutcome::Replaced;
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_put_new();

        let evicted = self.pool.len() >= self.capacity && self.evict_lru().is_some();

        let Some(id) = self.pool.acquire() else {
            error!(
                capacity = self.capacity,
                live = self.pool.len(),
                free = self.pool.free_len(),
                "slot pool exhausted after eviction"
            );
            panic!(
                "slot pool exhausted with {} live entries (capacity {})",
                self.pool.len(),
                self.capacity
            );
        };
        self.pool.set_value(id, fingerprint, value);
        self.index.insert(fingerprint, id);
        self.recency.get_mut().push_front(id);

        PutOutcome::Inserted { evicted }
    }

    /// Destroys the least recently used entry, returning its fingerprint.
    fn evict_lru(&mut self) -> Option<Fingerprint> {
        let id = self.recency.get_mut().pop_back()?;
        let fingerprint = self.pool.fingerprint_at(id)?;
        self.index.delete(fingerprint);
        self.pool.release(id);

        trace!(%fingerprint, slot = id.index(), "evicted lru entry");
        #[cfg(feature = "metrics")]
        {
            self.metrics.record_evicted_entry();
            self.metrics.record_destroyed(1);
        }

        Some(fingerprint)
    }

    /// Removes and destroys the entry for `key`. Returns `false` if there was
    /// nothing to remove or the cache is invalid.
    pub fn remove<K: CacheKey + ?Sized>(&mut self, key: &K) -> bool {
        if !self.valid {
            return false;
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_remove_call();

        let Some(id) = self.index.delete(key.fingerprint()) else {
            return false;
        };
        self.recency.get_mut().remove(id);
        self.pool.release(id);

        #[cfg(feature = "metrics")]
        {
            self.metrics.record_remove_found();
            self.metrics.record_destroyed(1);
        }
        true
    }

    /// Stops serving and accepting entries. Stored values are left in place
    /// until [`clear`](Self::clear).
    pub fn invalidate(&mut self) {
        #[cfg(feature = "metrics")]
        self.metrics.record_invalidate();

        if self.valid {
            debug!(live = self.pool.len(), "cache invalidated");
        }
        self.valid = false;
    }

    /// Destroys every value, resets the pool, list and index, and makes the
    /// cache valid again. Returns the number of values destroyed.
    pub fn clear(&mut self) -> usize {
        let values = self.pool.drain();
        self.recency.get_mut().clear();
        self.index.clear();
        self.valid = true;

        #[cfg(feature = "metrics")]
        self.metrics.record_clear();

        let destroyed = self.dispose(values);
        debug!(destroyed, "cache cleared");
        destroyed
    }

    /// Destroys every value, frees the slot array, links and index, and
    /// leaves the cache invalid.
    ///
    /// Used when the owning namespace goes away while handles to the cache
    /// may still be alive. A torn-down cache has capacity 0: a later
    /// [`clear`](Self::clear) makes it valid again, but it rejects every
    /// `put`.
    pub fn teardown(&mut self) -> usize {
        let values = self.pool.release_storage();
        self.recency.get_mut().release_storage();
        self.index.release_storage();
        self.capacity = 0;
        self.valid = false;

        let destroyed = self.dispose(values);
        debug!(destroyed, "cache torn down");
        destroyed
    }

    /// Destroys values already detached from every structure.
    fn dispose(&self, values: Vec<V>) -> usize {
        #[cfg(feature = "metrics")]
        self.metrics.record_destroyed(values.len() as u64);

        self.pool.dispose(values)
    }

    /// Returns `true` unless the cache has been invalidated (and not since
    /// cleared).
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Number of live entries, including entries held while invalid.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fingerprints from most to least recently used.
    pub fn recency_order(&self) -> Vec<Fingerprint> {
        let recency = self.recency.lock();
        recency
            .iter()
            .filter_map(|id| self.pool.fingerprint_at(id))
            .collect()
    }

    /// Verifies that pool, recency list and index describe the same entries.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let recency = self.recency.lock();
        let live = self.pool.len();

        if live > self.capacity {
            return Err(InvariantError::new(format!(
                "{live} live entries exceed capacity {}",
                self.capacity
            )));
        }
        if self.index.len() != live || recency.len() != live {
            return Err(InvariantError::new(format!(
                "index has {} entries, recency list {}, pool {live}",
                self.index.len(),
                recency.len()
            )));
        }
        if self.pool.bump_cursor() != live + self.pool.free_len() {
            return Err(InvariantError::new(format!(
                "bump cursor {} != live {live} + free {}",
                self.pool.bump_cursor(),
                self.pool.free_len()
            )));
        }

        let mut walked = 0usize;
        for id in recency.iter() {
            walked += 1;
            if walked > live {
                return Err(InvariantError::new("recency list longer than its length"));
            }
            let Some(fingerprint) = self.pool.fingerprint_at(id) else {
                return Err(InvariantError::new(format!(
                    "slot {} is linked but vacant",
                    id.index()
                )));
            };
            if self.index.lookup(fingerprint) != Some(id) {
                return Err(InvariantError::new(format!(
                    "fingerprint {fingerprint} at slot {} is not indexed to it",
                    id.index()
                )));
            }
        }
        if walked != live {
            return Err(InvariantError::new(format!(
                "walked {walked} linked slots, expected {live}"
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "metrics")]
impl<V> CacheCore<V> {
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            cache_len: self.pool.len(),
            capacity: self.capacity,
            valid: self.valid,
            ..self.metrics.counters()
        }
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsSnapshotProvider<CacheMetricsSnapshot> for CacheCore<V> {
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<V> fmt::Debug for CacheCore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCore")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

/// Thread-safe query result cache.
///
/// Wraps a [`CacheCore`] in a `parking_lot::RwLock`: lookups share the read
/// lock, every mutating operation takes the write lock. Values still cached
/// when the `QueryCache` is dropped are destroyed then.
pub struct QueryCache<V> {
    inner: RwLock<CacheCore<V>>,
}

impl<V> QueryCache<V> {
    /// Creates a cache that destroys values by dropping them.
    ///
    /// # Example
    ///
    /// ```
    /// use querycache::cache::QueryCache;
    ///
    /// let cache: QueryCache<String> = QueryCache::new(64);
    /// assert_eq!(cache.capacity(), 64);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self::with_shared_destructor(capacity, Arc::new(DropDestructor))
    }

    /// Like [`new`](Self::new), but rejects a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::zero_capacity("query cache"));
        }
        Ok(Self::new(capacity))
    }

    /// Creates a cache that hands evicted, removed and cleared values to
    /// `destructor`.
    pub fn with_destructor<D>(capacity: usize, destructor: D) -> Self
    where
        D: Destructor<V> + 'static,
    {
        Self::with_shared_destructor(capacity, Arc::new(destructor))
    }

    /// Creates a cache sharing an existing destructor.
    pub fn with_shared_destructor(capacity: usize, destructor: Arc<dyn Destructor<V>>) -> Self {
        Self {
            inner: RwLock::new(CacheCore::new(capacity, destructor)),
        }
    }

    /// Runs `f` on the cached value for `key`, promoting it to MRU.
    ///
    /// `f` runs under the read lock; other readers proceed concurrently, but
    /// writers wait until it returns. The lock is not reentrant: `f` must not
    /// call back into this cache, or it may deadlock against a queued writer.
    ///
    /// # Example
    ///
    /// ```
    /// use querycache::cache::QueryCache;
    ///
    /// let cache: QueryCache<Vec<u64>> = QueryCache::new(4);
    /// let _ = cache.put("MATCH (n) RETURN count(n)", vec![42]);
    ///
    /// let first = cache.get_with("MATCH (n) RETURN count(n)", |rows| rows[0]);
    /// assert_eq!(first, Some(42));
    /// assert_eq!(cache.get_with("RETURN 1", |rows| rows.len()), None);
    /// ```
    pub fn get_with<K, R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: CacheKey + ?Sized,
    {
        let cache = self.inner.read();
        cache.get(key).map(f)
    }

    /// Returns a clone of the cached value for `key`, promoting it to MRU.
    pub fn get<K>(&self, key: &K) -> Option<V>
    where
        K: CacheKey + ?Sized,
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Runs `f` on the cached value without changing recency.
    pub fn peek_with<K, R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: CacheKey + ?Sized,
    {
        let cache = self.inner.read();
        cache.peek(key).map(f)
    }

    /// Returns `true` if `key` is cached and the cache is valid.
    pub fn contains<K: CacheKey + ?Sized>(&self, key: &K) -> bool {
        let cache = self.inner.read();
        cache.contains(key)
    }

    /// Stores `value` under `key`; see [`CacheCore::put`].
    ///
    /// # Example
    ///
    /// ```
    /// use querycache::cache::{PutOutcome, QueryCache};
    ///
    /// let cache: QueryCache<u32> = QueryCache::new(1);
    /// assert_eq!(cache.put("a", 1), PutOutcome::Inserted { evicted: false });
    /// assert_eq!(cache.put("a", 2), PutOutcome::Replaced);
    /// assert_eq!(cache.put("b", 3), PutOutcome::Inserted { evicted: true });
    ///
    /// cache.invalidate();
    /// assert_eq!(cache.put("c", 4), PutOutcome::Rejected(4));
    /// ```
    pub fn put<K: CacheKey + ?Sized>(&self, key: &K, value: V) -> PutOutcome<V> {
        let mut cache = self.inner.write();
        cache.put(key, value)
    }

    /// Removes and destroys the entry for `key`.
    pub fn remove<K: CacheKey + ?Sized>(&self, key: &K) -> bool {
        let mut cache = self.inner.write();
        cache.remove(key)
    }

    /// Stops serving and accepting entries; see [`CacheCore::invalidate`].
    pub fn invalidate(&self) {
        let mut cache = self.inner.write();
        cache.invalidate();
    }

    /// Destroys all values and makes the cache valid again.
    pub fn clear(&self) -> usize {
        let mut cache = self.inner.write();
        cache.clear()
    }

    /// Destroys all values, frees the cache's storage and leaves it invalid;
    /// see [`CacheCore::teardown`].
    pub fn teardown(&self) -> usize {
        let mut cache = self.inner.write();
        cache.teardown()
    }

    pub fn is_valid(&self) -> bool {
        let cache = self.inner.read();
        cache.is_valid()
    }

    pub fn len(&self) -> usize {
        let cache = self.inner.read();
        cache.len()
    }

    pub fn is_empty(&self) -> bool {
        let cache = self.inner.read();
        cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        let cache = self.inner.read();
        cache.capacity()
    }

    /// Fingerprints from most to least recently used.
    pub fn recency_order(&self) -> Vec<Fingerprint> {
        let cache = self.inner.read();
        cache.recency_order()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let cache = self.inner.read();
        cache.check_invariants()
    }
}

#[cfg(feature = "metrics")]
impl<V> QueryCache<V> {
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        let cache = self.inner.read();
        cache.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsSnapshotProvider<CacheMetricsSnapshot> for QueryCache<V> {
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<V> fmt::Debug for QueryCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.read();
        f.debug_struct("QueryCache")
            .field("len", &cache.len())
            .field("capacity", &cache.capacity())
            .field("valid", &cache.is_valid())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fingerprint::fingerprint;

    /// Destructor that counts destructions per value.
    #[derive(Default)]
    struct Ledger {
        destroyed: parking_lot::Mutex<HashMap<u32, usize>>,
    }

    impl Ledger {
        fn count(&self, value: u32) -> usize {
            self.destroyed.lock().get(&value).copied().unwrap_or(0)
        }

        fn total(&self) -> usize {
            self.destroyed.lock().values().sum()
        }
    }

    impl Destructor<u32> for Ledger {
        fn destroy(&self, value: u32) {
            *self.destroyed.lock().entry(value).or_default() += 1;
        }
    }

    fn ledger_cache(capacity: usize) -> (QueryCache<u32>, Arc<Ledger>) {
        let ledger = Arc::new(Ledger::default());
        let cache = QueryCache::with_shared_destructor(capacity, ledger.clone());
        (cache, ledger)
    }

    fn fps(keys: &[&str]) -> Vec<Fingerprint> {
        keys.iter().map(|k| fingerprint(k.as_bytes())).collect()
    }

    // ==============================================
    // CORRECTNESS
    // ==============================================
    mod correctness {
        use super::*;

        #[test]
        fn put_then_get_round_trips() {
            let (cache, _) = ledger_cache(4);
            assert_eq!(cache.put("q", 7), PutOutcome::Inserted { evicted: false });
            assert_eq!(cache.get("q"), Some(7));
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn miss_returns_none() {
            let (cache, _) = ledger_cache(4);
            assert_eq!(cache.get("absent"), None);
            assert!(!cache.contains("absent"));
        }

        #[test]
        fn concrete_capacity_two_scenario() {
            let (cache, ledger) = ledger_cache(2);
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            assert_eq!(cache.recency_order(), fps(&["b", "a"]));

            assert_eq!(cache.get("a"), Some(1));
            assert_eq!(cache.recency_order(), fps(&["a", "b"]));

            assert_eq!(cache.put("c", 3), PutOutcome::Inserted { evicted: true });
            assert_eq!(ledger.count(2), 1);
            assert_eq!(cache.get("b"), None);
            assert_eq!(cache.get("a"), Some(1));
            assert_eq!(cache.get("c"), Some(3));
            cache.check_invariants().unwrap();
        }

        #[test]
        fn get_on_first_key_shields_it_from_eviction() {
            let k = 5;
            let (cache, _) = ledger_cache(k);
            let keys: Vec<String> = (0..=k).map(|i| format!("MATCH (n:L{i}) RETURN n")).collect();
            for (i, key) in keys.iter().take(k).enumerate() {
                let _ = cache.put(key, i as u32);
            }
            assert!(cache.get(&keys[0]).is_some());
            let _ = cache.put(&keys[k], 99);

            assert!(cache.contains(&keys[0]));
            assert!(!cache.contains(&keys[1]));
            assert_eq!(cache.len(), k);
        }

        #[test]
        fn peek_does_not_promote() {
            let (cache, _) = ledger_cache(2);
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            assert_eq!(cache.peek_with("a", |v| *v), Some(1));
            let _ = cache.put("c", 3);
            assert!(!cache.contains("a"));
            assert!(cache.contains("b"));
        }

        #[test]
        fn duplicate_put_replaces_and_destroys_old() {
            let (cache, ledger) = ledger_cache(2);
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            assert_eq!(cache.put("a", 10), PutOutcome::Replaced);

            assert_eq!(ledger.count(1), 1);
            assert_eq!(cache.get("a"), Some(10));
            assert_eq!(cache.len(), 2);
            // replacement promoted "a", so "b" is the victim
            let _ = cache.put("c", 3);
            assert!(!cache.contains("b"));
            cache.check_invariants().unwrap();
        }

        #[test]
        fn remove_destroys_and_frees_slot() {
            let (cache, ledger) = ledger_cache(2);
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            assert!(cache.remove("a"));
            assert!(!cache.remove("a"));
            assert_eq!(ledger.count(1), 1);
            assert_eq!(cache.len(), 1);

            // freed slot is reused without evicting "b"
            assert_eq!(cache.put("c", 3), PutOutcome::Inserted { evicted: false });
            assert!(cache.contains("b"));
            cache.check_invariants().unwrap();
        }

        #[test]
        fn fingerprint_keys_address_the_same_entry() {
            let (cache, _) = ledger_cache(2);
            let fp = fingerprint(b"RETURN 1");
            let _ = cache.put(&fp, 5);
            assert_eq!(cache.get("RETURN 1"), Some(5));
            assert!(cache.remove(b"RETURN 1".as_slice()));
        }

        #[test]
        fn zero_capacity_rejects_everything() {
            let (cache, ledger) = ledger_cache(0);
            assert_eq!(cache.put("a", 1), PutOutcome::Rejected(1));
            assert_eq!(cache.get("a"), None);
            assert_eq!(ledger.total(), 0);
            assert!(QueryCache::<u32>::try_new(0).is_err());
        }

        #[test]
        fn put_outcome_helpers() {
            assert!(PutOutcome::<u32>::Replaced.is_stored());
            assert!(PutOutcome::<u32>::Inserted { evicted: true }.is_stored());
            assert!(!PutOutcome::Rejected(3).is_stored());
            assert_eq!(PutOutcome::Rejected(3).into_rejected(), Some(3));
            assert_eq!(PutOutcome::<u32>::Replaced.into_rejected(), None);
        }
    }

    // ==============================================
    // INVALIDATE / CLEAR PROTOCOL
    // ==============================================
    mod validity {
        use super::*;

        #[test]
        fn invalidate_hides_entries_without_destroying() {
            let (cache, ledger) = ledger_cache(2);
            let _ = cache.put("a", 1);
            cache.invalidate();

            assert!(!cache.is_valid());
            assert_eq!(cache.get("a"), None);
            assert!(!cache.contains("a"));
            assert_eq!(cache.peek_with("a", |v| *v), None);
            assert_eq!(cache.len(), 1);
            assert_eq!(ledger.total(), 0);
        }

        #[test]
        fn invalid_cache_rejects_put_and_ignores_remove() {
            let (cache, ledger) = ledger_cache(2);
            let _ = cache.put("a", 1);
            cache.invalidate();

            assert_eq!(cache.put("b", 2), PutOutcome::Rejected(2));
            assert!(!cache.remove("a"));
            assert_eq!(ledger.total(), 0);
        }

        #[test]
        fn invalidate_is_idempotent() {
            let (cache, _) = ledger_cache(2);
            let _ = cache.put("a", 1);
            cache.invalidate();
            cache.invalidate();
            assert!(!cache.is_valid());
            assert_eq!(cache.get("a"), None);
            assert_eq!(cache.put("b", 2), PutOutcome::Rejected(2));
        }

        #[test]
        fn clear_destroys_all_and_revalidates() {
            let (cache, ledger) = ledger_cache(2);
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            let _ = cache.get("a");
            cache.invalidate();
            assert_eq!(cache.get("a"), None);

            assert_eq!(cache.clear(), 2);
            assert!(cache.is_valid());
            assert_eq!(cache.get("a"), None);
            assert_eq!(ledger.count(1), 1);
            assert_eq!(ledger.count(2), 1);

            let _ = cache.put("a", 9);
            assert_eq!(cache.get("a"), Some(9));
            cache.check_invariants().unwrap();
        }

        #[test]
        fn teardown_destroys_all_and_stays_invalid() {
            let (cache, ledger) = ledger_cache(3);
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            assert_eq!(cache.teardown(), 2);
            assert!(!cache.is_valid());
            assert!(cache.is_empty());
            assert_eq!(ledger.total(), 2);
        }
    }

    // ==============================================
    // OWNERSHIP
    // ==============================================
    mod ownership {
        use super::*;

        #[test]
        fn every_value_destroyed_exactly_once() {
            let (cache, ledger) = ledger_cache(3);
            for i in 0..10u32 {
                let _ = cache.put(&format!("q{i}"), i);
            }
            assert!(cache.remove("q9"));
            let _ = cache.put("q8", 100);
            cache.clear();
            for i in 10..12u32 {
                let _ = cache.put(&format!("q{i}"), i);
            }
            drop(cache);

            for i in (0..12u32).chain([100]) {
                assert_eq!(ledger.count(i), 1, "value {i}");
            }
            assert_eq!(ledger.total(), 13);
        }

        #[test]
        fn drop_runs_value_drop_with_default_destructor() {
            let marker = Arc::new(());
            let cache: QueryCache<Arc<()>> = QueryCache::new(4);
            let _ = cache.put("a", Arc::clone(&marker));
            let _ = cache.put("b", Arc::clone(&marker));
            assert_eq!(Arc::strong_count(&marker), 3);
            drop(cache);
            assert_eq!(Arc::strong_count(&marker), 1);
        }

        #[test]
        fn rejected_value_is_handed_back_not_destroyed() {
            let (cache, ledger) = ledger_cache(1);
            cache.invalidate();
            let outcome = cache.put("a", 5);
            assert_eq!(outcome.into_rejected(), Some(5));
            assert_eq!(ledger.total(), 0);
        }
    }

    // ==============================================
    // PANICKING DESTRUCTOR
    // ==============================================
    mod panicking_destructor {
        use std::panic::{AssertUnwindSafe, catch_unwind};
        use std::sync::atomic::{AtomicBool, Ordering};

        use super::*;

        fn panics_once_on(target: u32) -> Arc<dyn Destructor<u32>> {
            let armed = AtomicBool::new(true);
            Arc::new(move |value: u32| {
                if value == target && armed.swap(false, Ordering::SeqCst) {
                    panic!("destructor failed on {value}");
                }
            })
        }

        #[test]
        fn eviction_panic_keeps_cache_usable() {
            let cache = QueryCache::with_shared_destructor(2, panics_once_on(1));
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);

            let result = catch_unwind(AssertUnwindSafe(|| cache.put("c", 3)));
            assert!(result.is_err());
            assert_eq!(cache.len(), 1);
            cache.check_invariants().unwrap();

            assert_eq!(cache.put("d", 4), PutOutcome::Inserted { evicted: false });
            assert_eq!(cache.put("e", 5), PutOutcome::Inserted { evicted: true });
            assert_eq!(cache.len(), 2);
            assert_eq!(cache.get("d"), Some(4));
            cache.check_invariants().unwrap();
        }

        #[test]
        fn clear_panic_leaves_no_stale_index_entries() {
            let cache = QueryCache::with_shared_destructor(3, panics_once_on(1));
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            let _ = cache.put("c", 3);

            let result = catch_unwind(AssertUnwindSafe(|| cache.clear()));
            assert!(result.is_err());
            assert!(cache.is_valid());
            assert!(cache.is_empty());
            cache.check_invariants().unwrap();

            assert_eq!(cache.put("a", 9), PutOutcome::Inserted { evicted: false });
            assert_eq!(cache.get("a"), Some(9));
            cache.check_invariants().unwrap();
        }
    }

    // ==============================================
    // SLOT REUSE
    // ==============================================
    mod slot_reuse {
        use super::*;

        #[test]
        fn steady_state_never_bumps_past_capacity() {
            let mut core: CacheCore<u32> = CacheCore::new(3, Arc::new(DropDestructor));
            for i in 0..50u32 {
                let _ = core.put(&format!("q{i}"), i);
                assert!(core.len() <= 3);
            }
            assert_eq!(core.pool.bump_cursor(), 3);
            core.check_invariants().unwrap();
        }

        #[test]
        fn clear_rewinds_the_pool() {
            let mut core: CacheCore<u32> = CacheCore::new(3, Arc::new(DropDestructor));
            let _ = core.put("a", 1);
            let _ = core.put("b", 2);
            core.clear();
            assert_eq!(core.pool.bump_cursor(), 0);
            assert_eq!(core.pool.free_len(), 0);
            core.check_invariants().unwrap();
        }

        #[test]
        fn teardown_frees_storage_and_rejects_later_puts() {
            let mut core: CacheCore<u32> = CacheCore::new(4, Arc::new(DropDestructor));
            let _ = core.put("a", 1);
            let _ = core.put("b", 2);

            assert_eq!(core.teardown(), 2);
            assert_eq!(core.capacity(), 0);
            assert_eq!(core.pool.capacity(), 0);
            core.check_invariants().unwrap();

            core.clear();
            assert!(core.is_valid());
            assert_eq!(core.put("a", 3), PutOutcome::Rejected(3));
            core.check_invariants().unwrap();
        }

        #[test]
        fn core_get_returns_borrowed_value() {
            let mut core: CacheCore<String> = CacheCore::new(2, Arc::new(DropDestructor));
            let _ = core.put("a", "rows".to_string());
            let value: Option<&String> = core.get("a");
            assert_eq!(value.map(String::as_str), Some("rows"));
        }
    }

    // ==============================================
    // METRICS
    // ==============================================
    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn snapshot_tracks_hits_misses_and_evictions() {
            let (cache, _) = ledger_cache(2);
            let _ = cache.put("a", 1);
            let _ = cache.put("b", 2);
            let _ = cache.get("a");
            let _ = cache.get("zzz");
            let _ = cache.put("c", 3);
            let _ = cache.put("c", 4);
            cache.invalidate();
            let _ = cache.put("d", 5);

            let snap = cache.metrics_snapshot();
            assert_eq!(snap.get_hits, 1);
            assert_eq!(snap.get_misses, 1);
            assert_eq!(snap.put_calls, 5);
            assert_eq!(snap.put_new, 3);
            assert_eq!(snap.put_replaced, 1);
            assert_eq!(snap.put_rejected, 1);
            assert_eq!(snap.evicted_entries, 1);
            assert_eq!(snap.destroyed_values, 2);
            assert_eq!(snap.invalidate_calls, 1);
            assert_eq!(snap.cache_len, 2);
            assert_eq!(snap.capacity, 2);
            assert!(!snap.valid);

            cache.clear();
            let snap = cache.snapshot();
            assert_eq!(snap.clear_calls, 1);
            assert_eq!(snap.destroyed_values, 4);
            assert!(snap.valid);
        }
    }
}
