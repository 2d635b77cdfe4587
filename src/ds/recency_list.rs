//! Recency ordering over slot-pool slots.
//!
//! A doubly linked list whose nodes are the [`SlotId`]s of occupied slots.
//! Links live in a fixed array parallel to the [`SlotPool`](super::SlotPool),
//! indexed by slot, so linking and unlinking never allocate:
//!
//! ```text
//!   links (Vec<Link>, one per pool slot)
//!   ┌──────┬──────────────────────────────────────────┐
//!   │ slot │ Link { prev, next, linked }              │
//!   ├──────┼──────────────────────────────────────────┤
//!   │  0   │ { prev: Some(2), next: None,    true }   │
//!   │  1   │ { prev: None,    next: None,    false }  │  (free)
//!   │  2   │ { prev: None,    next: Some(0), true }   │
//!   └──────┴──────────────────────────────────────────┘
//!
//!   head (MRU) ─► [2] ◄──► [0] ◄── tail (LRU)
//! ```
//!
//! ## Operations
//! - `push_front(id)`: link a newly filled slot as MRU
//! - `move_to_front(id)`: detach + attach to head (no-op if already head)
//! - `remove(id)`: unlink; the slot itself is untouched
//! - `pop_back()`: unlink and return the LRU slot
//!
//! All operations are O(1) except `iter` and `clear`.
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use crate::ds::slot_pool::SlotId;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    linked: bool,
}

/// Most- to least-recently-used ordering of slots.
#[derive(Debug)]
pub struct RecencyList {
    links: Vec<Link>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl RecencyList {
    /// Creates an empty list able to order `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            links: vec![Link::default(); capacity],
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Returns the number of linked slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is linked.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `id` is currently linked.
    pub fn contains(&self, id: SlotId) -> bool {
        self.links.get(id.0).is_some_and(|link| link.linked)
    }

    /// Most recently used slot.
    pub fn front(&self) -> Option<SlotId> {
        self.head
    }

    /// Least recently used slot (next eviction victim).
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    /// Links `id` at the front. Returns `false` if it is already linked or
    /// out of range.
    pub fn push_front(&mut self, id: SlotId) -> bool {
        match self.links.get(id.0) {
            Some(link) if !link.linked => {},
            _ => return false,
        }
        self.attach_front(id);
        self.len += 1;
        true
    }

    /// Promotes `id` to the front; returns `false` if it is not linked.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }
        self.detach(id);
        self.attach_front(id);
        true
    }

    /// Unlinks `id`; returns `false` if it was not linked.
    pub fn remove(&mut self, id: SlotId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.detach(id);
        self.links[id.0].linked = false;
        self.len -= 1;
        true
    }

    /// Unlinks and returns the least recently used slot.
    pub fn pop_back(&mut self) -> Option<SlotId> {
        let id = self.tail?;
        self.remove(id);
        Some(id)
    }

    /// Unlinks every slot.
    pub fn clear(&mut self) {
        self.links.fill(Link::default());
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Unlinks every slot and frees the link array; the list can order no
    /// slots afterwards.
    pub fn release_storage(&mut self) {
        self.links = Vec::new();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Returns an iterator from front (MRU) to back (LRU).
    pub fn iter(&self) -> RecencyIter<'_> {
        RecencyIter {
            list: self,
            current: self.head,
        }
    }

    fn detach(&mut self, id: SlotId) {
        let Link { prev, next, .. } = self.links[id.0];

        match prev {
            Some(prev_id) => self.links[prev_id.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(next_id) => self.links[next_id.0].prev = prev,
            None => self.tail = prev,
        }

        let link = &mut self.links[id.0];
        link.prev = None;
        link.next = None;
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        self.links[id.0] = Link {
            prev: None,
            next: old_head,
            linked: true,
        };
        match old_head {
            Some(old_head) => self.links[old_head.0].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len, 0);
            return;
        }

        let mut seen = vec![false; self.links.len()];
        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(id) = current {
            assert!(!seen[id.0], "cycle through slot {}", id.0);
            seen[id.0] = true;
            let link = self.links[id.0];
            assert!(link.linked);
            assert_eq!(link.prev, prev);
            if link.next.is_none() {
                assert_eq!(self.tail, Some(id));
            }
            prev = Some(id);
            current = link.next;
            count += 1;
            assert!(count <= self.len);
        }

        assert_eq!(count, self.len);
        assert_eq!(
            self.links.iter().filter(|link| link.linked).count(),
            self.len
        );
    }
}

/// Iterator over linked slots from front to back.
pub struct RecencyIter<'a> {
    list: &'a RecencyList,
    current: Option<SlotId>,
}

impl Iterator for RecencyIter<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.list.links[id.0].next;
        Some(id)
    }
}
