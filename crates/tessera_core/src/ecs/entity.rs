//! # Entity Identifiers
//!
//! Entities are bare ids. They carry no data; everything attached to an
//! entity lives in the component registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an entity.
///
/// Ids increase monotonically and are never reused within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lock-free entity id source.
///
/// The first id handed out is 1.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    last: AtomicU64,
}

impl EntityAllocator {
    /// Creates an allocator that has not handed out any id yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Allocates the next id. Concurrent callers never observe the same id.
    #[inline]
    pub fn allocate(&self) -> EntityId {
        EntityId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Number of ids handed out so far.
    #[inline]
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}
