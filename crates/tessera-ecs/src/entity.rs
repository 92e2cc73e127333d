//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a plain 64-bit handle. Ids are issued monotonically and
//! are never reused within a core instance, so a handle observed anywhere in
//! a session stays unambiguous for that session's lifetime. There is no
//! generation counter: nothing ever refers to a recycled slot.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Unique 64-bit handle identifying one logical entity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// The inert null id. Never issued by an allocator; used as the entity
    /// argument when probing a component's field schema.
    pub const NULL: EntityId = EntityId(0);

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Issues monotonically increasing [`EntityId`]s.
///
/// The first allocated id is 1; id 0 is reserved as [`EntityId::NULL`]. The
/// high-water mark can be advanced past ids observed in a deserialized
/// document so that subsequently allocated ids remain unique.
#[derive(Debug)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Create a new allocator.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next [`EntityId`].
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Ensure no future allocation can collide with `id`.
    ///
    /// No-op if `id` is already below the high-water mark.
    pub fn advance_past(&mut self, id: EntityId) {
        if id.to_raw() >= self.next {
            self.next = id.to_raw() + 1;
        }
    }

    /// The raw value the next allocation would return.
    pub fn peek_next(&self) -> u64 {
        self.next
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<EntityId> = (0..100).map(|_| alloc.allocate()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ids[0], EntityId::from_raw(1));
    }

    #[test]
    fn null_id_is_never_issued() {
        let mut alloc = EntityAllocator::new();
        for _ in 0..10 {
            assert_ne!(alloc.allocate(), EntityId::NULL);
        }
    }

    #[test]
    fn advance_past_bumps_high_water() {
        let mut alloc = EntityAllocator::new();
        alloc.advance_past(EntityId::from_raw(41));
        assert_eq!(alloc.allocate(), EntityId::from_raw(42));
    }

    #[test]
    fn advance_past_below_high_water_is_noop() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        alloc.advance_past(a);
        let c = alloc.allocate();
        assert!(c > b);
    }

    #[test]
    fn entity_id_roundtrip() {
        let id = EntityId::from_raw(77);
        assert_eq!(EntityId::from_raw(id.to_raw()), id);
        assert_eq!(format!("{id}"), "77");
    }
}
