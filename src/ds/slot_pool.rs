//! Fixed-capacity slot pool with bump + free-list allocation.
//!
//! The pool allocates its whole slot array once, at construction, and never
//! grows or moves it; a [`SlotId`] therefore stays valid for the pool's
//! lifetime. Vacant slots come from two places:
//!
//! ```text
//!   slots:  [ occ | occ | free | occ | free | ---- untouched ---- ]
//!                          ▲            ▲     ▲
//!                          │            │     bump cursor
//!   free list (LIFO): [ 2, 4 ]  ◄── top ┘
//!
//!   acquire():  pop free list  ─►  else take slot at bump cursor, advance
//!                              ─►  else None (pool full)
//! ```
//!
//! Once the cache reaches steady state every allocation is a free-list pop;
//! the most recently freed slot is reused first, keeping hot slots hot.
//!
//! The pool is the only place values live and the only place they are
//! destroyed: [`release`](SlotPool::release), [`replace_value`](SlotPool::replace_value),
//! [`reset`](SlotPool::reset) and `Drop` all hand values to the pool's
//! [`Destructor`].

use std::fmt;
use std::sync::Arc;

use crate::fingerprint::Fingerprint;
use crate::traits::Destructor;

/// Stable handle to a slot in a [`SlotPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

struct Slot<V> {
    fingerprint: Fingerprint,
    value: Option<V>,
}

impl<V> Slot<V> {
    fn vacant() -> Self {
        Self {
            fingerprint: Fingerprint::from(0),
            value: None,
        }
    }

    fn is_occupied(&self) -> bool {
        self.value.is_some()
    }
}

pub struct SlotPool<V> {
    slots: Vec<Slot<V>>,
    free_list: Vec<usize>,
    bump: usize,
    len: usize,
    destructor: Arc<dyn Destructor<V>>,
}

impl<V> SlotPool<V> {
    /// Allocates `capacity` vacant slots.
    pub fn new(capacity: usize, destructor: Arc<dyn Destructor<V>>) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            free_list: Vec::with_capacity(capacity),
            bump: 0,
            len: 0,
            destructor,
        }
    }

    /// Hands out a vacant slot, or `None` when every slot is occupied.
    ///
    /// The slot stays vacant until [`set_value`](Self::set_value) fills it.
    pub fn acquire(&mut self) -> Option<SlotId> {
        if let Some(idx) = self.free_list.pop() {
            return Some(SlotId(idx));
        }
        if self.bump < self.slots.len() {
            let idx = self.bump;
            self.bump += 1;
            return Some(SlotId(idx));
        }
        None
    }

    /// Stores `value` in a previously acquired, vacant slot.
    pub fn set_value(&mut self, id: SlotId, fingerprint: Fingerprint, value: V) {
        let slot = &mut self.slots[id.0];
        debug_assert!(!slot.is_occupied(), "set_value on occupied slot {}", id.0);
        slot.fingerprint = fingerprint;
        slot.value = Some(value);
        self.len += 1;
    }

    /// Swaps in `value`, destroying the value the slot held.
    ///
    /// Returns `false` if the slot is vacant, in which case `value` itself is
    /// destroyed: ownership was already transferred to the pool.
    pub fn replace_value(&mut self, id: SlotId, value: V) -> bool {
        match self.slots.get_mut(id.0).and_then(|slot| slot.value.as_mut()) {
            Some(current) => {
                let old = std::mem::replace(current, value);
                self.destructor.destroy(old);
                true
            },
            None => {
                self.destructor.destroy(value);
                false
            },
        }
    }

    /// Destroys the slot's value and returns the slot to the free list.
    ///
    /// Bookkeeping completes before the destructor runs, so a panicking
    /// destructor cannot strand the slot. Releasing a vacant slot is a no-op.
    pub fn release(&mut self, id: SlotId) -> bool {
        let Some(value) = self.take(id) else {
            return false;
        };
        self.free_list.push(id.0);
        self.destructor.destroy(value);
        true
    }

    /// Moves the value out and marks the slot vacant without recycling it.
    fn take(&mut self, id: SlotId) -> Option<V> {
        let value = self.slots.get_mut(id.0)?.value.take()?;
        self.len -= 1;
        Some(value)
    }

    pub fn value_at(&self, id: SlotId) -> Option<&V> {
        self.slots.get(id.0).and_then(|slot| slot.value.as_ref())
    }

    pub fn fingerprint_at(&self, id: SlotId) -> Option<Fingerprint> {
        self.slots
            .get(id.0)
            .filter(|slot| slot.is_occupied())
            .map(|slot| slot.fingerprint)
    }

    pub fn is_occupied(&self, id: SlotId) -> bool {
        self.slots
            .get(id.0)
            .map(Slot::is_occupied)
            .unwrap_or(false)
    }

    /// Destroys every occupied value, rewinds the bump cursor and empties the
    /// free list. Returns the number of values destroyed.
    pub fn reset(&mut self) -> usize {
        let values = self.drain();
        self.dispose(values)
    }

    /// Moves every occupied value out, rewinds the bump cursor and empties
    /// the free list. The caller owns the values; see [`dispose`](Self::dispose).
    ///
    /// Only the touched prefix `[0, bump)` can hold values, so the sweep
    /// stops there.
    pub fn drain(&mut self) -> Vec<V> {
        let values: Vec<V> = self.slots[..self.bump]
            .iter_mut()
            .filter_map(|slot| slot.value.take())
            .collect();
        self.bump = 0;
        self.len = 0;
        self.free_list.clear();
        values
    }

    /// Like [`drain`](Self::drain), but also frees the slot array. The pool
    /// has capacity 0 afterwards.
    pub fn release_storage(&mut self) -> Vec<V> {
        let values = self.drain();
        self.slots = Vec::new();
        self.free_list = Vec::new();
        values
    }

    /// Hands each value to the pool's destructor, returning how many there
    /// were.
    ///
    /// If the destructor panics, the values not yet destroyed are dropped
    /// during unwinding instead.
    pub fn dispose(&self, values: Vec<V>) -> usize {
        let count = values.len();
        for value in values {
            self.destructor.destroy(value);
        }
        count
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of slots; fixed at construction.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the first never-used slot.
    pub fn bump_cursor(&self) -> usize {
        self.bump
    }

    /// Number of recycled slots waiting on the free list.
    pub fn free_len(&self) -> usize {
        self.free_list.len()
    }

    /// Iterates occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, Fingerprint, &V)> {
        self.slots[..self.bump]
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.value
                    .as_ref()
                    .map(|value| (SlotId(idx), slot.fingerprint, value))
            })
    }

    /// Checks that every slot below the bump cursor is either occupied or on
    /// the free list.
    ///
    /// Does not hold between [`acquire`](Self::acquire) and
    /// [`set_value`](Self::set_value): the acquired slot is in neither state.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let mut seen = vec![false; self.slots.len()];
        for &idx in &self.free_list {
            assert!(idx < self.bump, "free slot {idx} beyond bump cursor");
            assert!(!seen[idx], "slot {idx} on free list twice");
            assert!(!self.slots[idx].is_occupied(), "occupied slot {idx} on free list");
            seen[idx] = true;
        }
        let occupied = self.slots[..self.bump]
            .iter()
            .filter(|slot| slot.is_occupied())
            .count();
        assert_eq!(occupied, self.len);
        assert_eq!(occupied + self.free_list.len(), self.bump);
        assert!(self.slots[self.bump..].iter().all(|slot| !slot.is_occupied()));
    }
}

impl<V> Drop for SlotPool<V> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<V> fmt::Debug for SlotPool<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("bump", &self.bump)
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}
