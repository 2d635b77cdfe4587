//! Key fingerprinting.
//!
//! Every cache operation addresses entries by a 64-bit [`Fingerprint`] of the
//! caller's key rather than by the key itself; the key bytes are never
//! retained past hashing. Fingerprints are XXH64 digests (seed 0), so equal
//! keys always collide and unequal keys are assumed, but not guaranteed, to
//! differ. Two distinct queries that share a fingerprint will share a cache
//! entry; this is an accepted risk.
//!
//! ## Example
//!
//! ```
//! use querycache::fingerprint::{CacheKey, Fingerprint, fingerprint};
//!
//! let fp = fingerprint(b"MATCH (n) RETURN n");
//! assert_eq!(fp, "MATCH (n) RETURN n".fingerprint());
//!
//! // A precomputed fingerprint is its own key.
//! assert_eq!(fp.fingerprint(), fp);
//! assert_eq!(Fingerprint::from(fp.as_u64()), fp);
//! ```

use std::fmt;

use xxhash_rust::xxh64::xxh64;

const FINGERPRINT_SEED: u64 = 0;

/// 64-bit identity of a cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Returns the raw 64-bit digest.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Fingerprint {
    #[inline]
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:#018x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Fingerprints an arbitrary byte key.
#[inline]
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint(xxh64(bytes, FINGERPRINT_SEED))
}

/// Anything the cache can be addressed by.
///
/// Byte-like keys are hashed with [`fingerprint`]; a [`Fingerprint`] is used
/// as-is, which lets callers hash a query once and reuse the result across
/// `get` and `put`.
pub trait CacheKey {
    fn fingerprint(&self) -> Fingerprint;
}

impl CacheKey for Fingerprint {
    #[inline]
    fn fingerprint(&self) -> Fingerprint {
        *self
    }
}

impl CacheKey for [u8] {
    #[inline]
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }
}

impl CacheKey for Vec<u8> {
    #[inline]
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }
}

impl<const N: usize> CacheKey for [u8; N] {
    #[inline]
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }
}

impl CacheKey for str {
    #[inline]
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(self.as_bytes())
    }
}

impl CacheKey for String {
    #[inline]
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(self.as_bytes())
    }
}

impl<K: CacheKey + ?Sized> CacheKey for &K {
    #[inline]
    fn fingerprint(&self) -> Fingerprint {
        (**self).fingerprint()
    }
}
