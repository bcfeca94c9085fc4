//! # Subscriptions
//!
//! A subscription is the live result set of one [`Filter`]. The world pushes
//! membership changes into it; readers get an ascending snapshot that is only
//! rebuilt after membership actually changed.
//!
//! Per entity, relative to one subscription:
//!
//! ```text
//!              notify(true)
//!   not-member ────────────> member
//!       ^                      │
//!       └──────────────────────┘
//!              notify(false)
//!
//!   ignore(id) from any state -> ignored (until the entity dies, notify(true) has no effect)
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::bitset::BitVector;
use super::entity::EntityId;
use super::filter::Filter;

struct Membership {
    members: HashSet<EntityId>,
    ignored: HashSet<EntityId>,
    cache: Arc<[EntityId]>,
    dirty: bool,
}

impl Default for Membership {
    fn default() -> Self {
        Self {
            members: HashSet::new(),
            ignored: HashSet::new(),
            cache: Vec::new().into(),
            dirty: false,
        }
    }
}

/// Incrementally maintained set of entities matching a [`Filter`].
///
/// Shared between every system whose filter is structurally equal; obtain one
/// through [`World::add_subscription`](super::world::World::add_subscription).
pub struct Subscription {
    filter: Filter,
    membership: Mutex<Membership>,
}

impl Subscription {
    /// Creates an empty subscription for `filter`.
    #[must_use]
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            membership: Mutex::new(Membership::default()),
        }
    }

    /// The filter this subscription tracks.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Evaluates the filter against `components` and records the result.
    pub fn update(&self, entity: EntityId, components: &BitVector) {
        self.notify(entity, self.filter.allow(components));
    }

    /// Records whether `entity` currently passes the filter.
    pub fn notify(&self, entity: EntityId, allowed: bool) {
        let mut state = self.membership.lock();
        let changed = if allowed {
            !state.ignored.contains(&entity) && state.members.insert(entity)
        } else {
            state.members.remove(&entity)
        };
        state.dirty |= changed;
    }

    /// Drops `entity` and refuses to admit it again.
    pub fn ignore(&self, entity: EntityId) {
        let mut state = self.membership.lock();
        state.ignored.insert(entity);
        if state.members.remove(&entity) {
            state.dirty = true;
        }
    }

    /// Returns `true` if [`ignore`](Self::ignore) was called for `entity`.
    #[must_use]
    pub fn is_ignored(&self, entity: EntityId) -> bool {
        self.membership.lock().ignored.contains(&entity)
    }

    /// Forgets a dead entity: drops its membership and its ignore mark.
    ///
    /// Ids are never reused, so nothing can match `entity` again.
    pub(crate) fn evict(&self, entity: EntityId) {
        let mut state = self.membership.lock();
        state.ignored.remove(&entity);
        if state.members.remove(&entity) {
            state.dirty = true;
        }
    }

    /// Returns `true` if `entity` is currently a member.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.membership.lock().members.contains(&entity)
    }

    /// Number of current members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.membership.lock().members.len()
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current members in ascending id order.
    ///
    /// The snapshot is cached and shared until membership changes, so repeated
    /// reads between changes do not sort or allocate.
    #[must_use]
    pub fn entities(&self) -> Arc<[EntityId]> {
        let mut state = self.membership.lock();
        if state.dirty {
            let mut sorted: Vec<EntityId> = state.members.iter().copied().collect();
            sorted.sort_unstable();
            state.cache = sorted.into();
            state.dirty = false;
            tracing::trace!(members = state.cache.len(), "rebuilt subscription cache");
        }
        Arc::clone(&state.cache)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .field("members", &self.len())
            .finish()
    }
}
