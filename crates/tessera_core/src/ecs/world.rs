//! # World
//!
//! The world ties the entity table, the component registry and the
//! subscription list together and keeps them consistent.
//!
//! ## Lock order
//!
//! ```text
//! entity table ──> subscription list (read) ──> one subscription
//!      │
//!      └─────────> registry index (read) ──> one kind's instances
//! ```
//!
//! Every per-entity refresh holds the entity table's write lock, so concurrent
//! refreshes of the same entity are serialized and each one recomputes the
//! component vector from the registry. The last refresh always wins with the
//! current truth.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::bitset::BitVector;
use super::component::{Component, ComponentKindId, ComponentRegistry, ComponentStore};
use super::entity::{EntityAllocator, EntityId};
use super::filter::{Filter, FilterBuilder};
use super::subscription::Subscription;

/// Container for entities, their components and the subscriptions over them.
///
/// All methods take `&self`; share a world between threads with `Arc<World>`.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Component, World};
///
/// #[derive(Default)]
/// struct Position { x: f32 }
/// impl Component for Position { const NAME: &'static str = "position"; }
///
/// let world = World::new();
/// let moving = world.add_subscription(world.filter().require::<Position>().build());
///
/// let entity = world.new_entity();
/// world.components::<Position>().add(&world, entity).write().x = 4.0;
///
/// assert_eq!(&*moving.entities(), &[entity]);
/// ```
#[derive(Default)]
pub struct World {
    registry: ComponentRegistry,
    entities: RwLock<HashMap<EntityId, BitVector>>,
    subscriptions: RwLock<Vec<Arc<Subscription>>>,
    allocator: EntityAllocator,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The component registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Registers kind `T` and returns its id.
    pub fn register<T: Component>(&self) -> ComponentKindId {
        self.registry.register::<T>()
    }

    /// Typed store for `T`, registering the kind on first use.
    #[must_use]
    pub fn components<T: Component>(&self) -> ComponentStore<T> {
        self.registry.store::<T>()
    }

    /// Starts a [`FilterBuilder`] against this world's registry.
    #[must_use]
    pub fn filter(&self) -> FilterBuilder<'_> {
        FilterBuilder::new(&self.registry)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// Subscriptions whose filter admits a bare entity pick it up immediately.
    pub fn new_entity(&self) -> EntityId {
        let id = self.allocator.allocate();
        let bits = BitVector::new();

        let mut entities = self.entities.write();
        for subscription in self.subscriptions.read().iter() {
            subscription.update(id, &bits);
        }
        entities.insert(id, bits);

        trace!(entity = %id, "created entity");
        id
    }

    /// Removes an entity, its components and its subscription memberships.
    ///
    /// Returns `false` if the entity was not alive. Removing twice is a no-op.
    pub fn remove_entity(&self, id: EntityId) -> bool {
        let mut entities = self.entities.write();
        if entities.remove(&id).is_none() {
            return false;
        }

        for subscription in self.subscriptions.read().iter() {
            subscription.evict(id);
        }
        let dropped = self.registry.purge_entity(id);

        trace!(entity = %id, components = dropped, "removed entity");
        true
    }

    /// Returns `true` if `id` was created and not yet removed.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.read().contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.read().len()
    }

    /// Live entity ids in ascending order.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The cached component vector of a live entity.
    #[must_use]
    pub fn component_vector(&self, id: EntityId) -> Option<BitVector> {
        self.entities.read().get(&id).cloned()
    }

    /// Recomputes the component vector of `id` and pushes it through every
    /// subscription.
    ///
    /// Component stores call this after each add and remove. Instances
    /// attached to an id that is not alive are discarded.
    pub fn update_entity(&self, id: EntityId) {
        let mut entities = self.entities.write();
        let Some(bits) = entities.get_mut(&id) else {
            let dropped = self.registry.purge_entity(id);
            if dropped > 0 {
                debug!(entity = %id, components = dropped, "dropped components of dead entity");
            }
            return;
        };

        *bits = self.registry.component_vector(id);
        for subscription in self.subscriptions.read().iter() {
            subscription.update(id, bits);
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Returns the subscription for `filter`, creating it if needed.
    ///
    /// Structurally equal filters share one subscription. A new subscription
    /// is back-filled with every existing entity that could match.
    pub fn add_subscription(&self, filter: Filter) -> Arc<Subscription> {
        let subscription = {
            let mut subscriptions = self.subscriptions.write();
            if let Some(existing) = subscriptions.iter().find(|s| *s.filter() == filter) {
                return Arc::clone(existing);
            }
            let subscription = Arc::new(Subscription::new(filter));
            subscriptions.push(Arc::clone(&subscription));
            subscription
        };

        let candidates = self.backfill_candidates(subscription.filter());
        debug!(
            filter = ?subscription.filter(),
            candidates = candidates.len(),
            "added subscription"
        );
        for id in candidates {
            self.update_entity(id);
        }

        subscription
    }

    /// Every subscription created so far, in creation order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions.read().clone()
    }

    /// Number of distinct subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    fn backfill_candidates(&self, filter: &Filter) -> BTreeSet<EntityId> {
        if filter.matches_bare() {
            return self.entities.read().keys().copied().collect();
        }

        filter
            .referenced_kinds()
            .into_iter()
            .filter_map(ComponentKindId::from_index)
            .flat_map(|kind| self.registry.entities_with(kind))
            .collect()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entity_count())
            .field("kinds", &self.registry.len())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
