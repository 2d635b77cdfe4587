//! # Value Contract
//!
//! Cached values are opaque to the cache. Each cache is constructed with a
//! [`Destructor`] that it invokes exactly once per accepted value, on exactly
//! one of these paths:
//!
//! ```text
//!   put(k, v) ──accepted──► slot ──┬── eviction (LRU tail)        ─┐
//!                                  ├── remove(k)                   │
//!                                  ├── put(k, v') replaces v       ├──► destroy(v)
//!                                  ├── clear() / teardown()        │
//!                                  └── cache dropped               ─┘
//!
//!   put(k, v) ──rejected (invalid cache)──► v handed back to caller
//! ```
//!
//! Reads never destroy. The default [`DropDestructor`] simply drops the value,
//! which is the right choice whenever `V: Drop` already does the cleanup;
//! callers that need to return buffers to a pool, decrement external
//! refcounts, or count destructions supply their own closure.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use querycache::builder::CacheBuilder;
//!
//! let destroyed = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&destroyed);
//! let cache = CacheBuilder::new(1)
//!     .destructor(move |_rows: Vec<u64>| {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     })
//!     .build();
//!
//! let _ = cache.put("q1", vec![1, 2, 3]);
//! let _ = cache.put("q2", vec![4]); // evicts q1
//! assert_eq!(destroyed.load(Ordering::Relaxed), 1);
//! ```

use std::fmt;

/// Releases a value the cache owns.
///
/// Runs while the cache's write lock is held, and the lock is not
/// reentrant: a destructor must not call back into the cache that owns the
/// value, or it deadlocks. The cache's bookkeeping is complete before the
/// destructor runs, so a panicking destructor leaves the cache consistent.
pub trait Destructor<V>: Send + Sync {
    fn destroy(&self, value: V);
}

impl<V, F> Destructor<V> for F
where
    F: Fn(V) + Send + Sync,
{
    #[inline]
    fn destroy(&self, value: V) {
        self(value)
    }
}

/// Destroys values by dropping them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DropDestructor;

impl<V> Destructor<V> for DropDestructor {
    #[inline]
    fn destroy(&self, value: V) {
        drop(value);
    }
}

impl<V> fmt::Debug for dyn Destructor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Destructor")
    }
}
