//! Fingerprint → slot lookup.

use rustc_hash::FxHashMap;

use crate::ds::slot_pool::SlotId;
use crate::fingerprint::Fingerprint;

/// Maps each live fingerprint to the slot holding its value.
///
/// A fingerprint maps to at most one slot; callers check [`lookup`](Self::lookup)
/// before [`insert`](Self::insert). The map is sized for the cache capacity up
/// front, so it does not rehash while the cache fills.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    map: FxHashMap<Fingerprint, SlotId>,
}

impl FingerprintIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    #[inline]
    pub fn lookup(&self, fingerprint: Fingerprint) -> Option<SlotId> {
        self.map.get(&fingerprint).copied()
    }

    #[inline]
    pub fn insert(&mut self, fingerprint: Fingerprint, id: SlotId) {
        let previous = self.map.insert(fingerprint, id);
        debug_assert!(
            previous.is_none(),
            "fingerprint {fingerprint} already indexed at slot {:?}",
            previous
        );
    }

    /// Removes the mapping, returning the slot it pointed at.
    #[inline]
    pub fn delete(&mut self, fingerprint: Fingerprint) -> Option<SlotId> {
        self.map.remove(&fingerprint)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drops every mapping but keeps the allocation.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Drops every mapping and the allocation.
    pub fn release_storage(&mut self) {
        self.map = FxHashMap::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Fingerprint, SlotId)> + '_ {
        self.map.iter().map(|(&fp, &id)| (fp, id))
    }
}
