//! # Component Registry
//!
//! Assigns dense [`ComponentKindId`]s to component kinds and owns one
//! instance map per kind.
//!
//! ## Design
//!
//! - A kind is identified by its explicit [`Component::NAME`], never by
//!   runtime type introspection. Ids are handed out in registration order.
//! - Every kind's instance map sits behind its own lock, so unrelated kinds
//!   never contend. Registry metadata (name → id → storage) has a separate lock.
//! - Instances are shared as [`ComponentRef`]s so systems running on other
//!   threads can hold and mutate them without keeping a map lock.
//!
//! Typed access goes through [`ComponentStore`], the per-kind handle. Mutating
//! store operations take the [`World`] explicitly so subscription membership
//! is refreshed after every add/remove.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::bitset::BitVector;
use super::entity::EntityId;
use super::world::World;

/// Marker trait for component payloads.
///
/// `Default` is the factory used when a component is added to an entity.
///
/// # Example
///
/// ```rust
/// use tessera_core::Component;
///
/// #[derive(Default)]
/// struct Health {
///     points: u32,
/// }
///
/// impl Component for Health {
///     const NAME: &'static str = "health";
/// }
/// ```
pub trait Component: Default + Send + Sync + 'static {
    /// Stable registration key for this kind.
    ///
    /// Two distinct types must never share a name.
    const NAME: &'static str;
}

/// Shared handle to one component instance.
pub type ComponentRef<T> = Arc<RwLock<T>>;

/// Dense identifier of a registered component kind. Doubles as a bit index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentKindId(u32);

impl ComponentKindId {
    /// Converts a bit index back into a kind id.
    #[inline]
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }

    /// Returns the id as a bit index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind:{}", self.0)
    }
}

/// Type-erased view of one kind's instance map.
pub(crate) trait ErasedStorage: Send + Sync {
    fn name(&self) -> &'static str;
    fn component_type(&self) -> TypeId;
    fn contains(&self, entity: EntityId) -> bool;
    fn remove(&self, entity: EntityId) -> bool;
    fn entities(&self) -> Vec<EntityId>;
    fn len(&self) -> usize;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Instance map for a single kind.
struct KindStorage<T: Component> {
    instances: RwLock<HashMap<EntityId, ComponentRef<T>>>,
}

impl<T: Component> KindStorage<T> {
    fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Component> ErasedStorage for KindStorage<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn component_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.instances.read().contains_key(&entity)
    }

    fn remove(&self, entity: EntityId) -> bool {
        self.instances.write().remove(&entity).is_some()
    }

    fn entities(&self) -> Vec<EntityId> {
        self.instances.read().keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.instances.read().len()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[derive(Default)]
struct KindIndex {
    by_name: HashMap<&'static str, ComponentKindId>,
    kinds: Vec<Arc<dyn ErasedStorage>>,
}

/// Registry of component kinds and their instance maps.
#[derive(Default)]
pub struct ComponentRegistry {
    index: RwLock<KindIndex>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers kind `T`, returning its id. Registering twice returns the same id.
    ///
    /// # Panics
    ///
    /// Panics if a different type already registered under `T::NAME`.
    pub fn register<T: Component>(&self) -> ComponentKindId {
        if let Some(id) = self.lookup::<T>() {
            return id;
        }

        let mut index = self.index.write();
        // another thread may have won the race between the two locks
        if let Some(&id) = index.by_name.get(T::NAME) {
            assert_same_type::<T>(index.kinds[id.index()].as_ref());
            return id;
        }

        let id = ComponentKindId(
            u32::try_from(index.kinds.len()).expect("component kind ids exhausted"),
        );
        index.kinds.push(Arc::new(KindStorage::<T>::new()));
        index.by_name.insert(T::NAME, id);

        tracing::debug!(kind = T::NAME, id = id.0, "registered component kind");
        id
    }

    /// Returns the id of `T` without registering it.
    #[must_use]
    pub fn kind_id<T: Component>(&self) -> Option<ComponentKindId> {
        self.lookup::<T>()
    }

    /// Returns the id registered under `name`.
    #[must_use]
    pub fn kind_id_by_name(&self, name: &str) -> Option<ComponentKindId> {
        self.index.read().by_name.get(name).copied()
    }

    /// Returns the name of a registered kind.
    #[must_use]
    pub fn kind_name(&self, id: ComponentKindId) -> Option<&'static str> {
        self.storage(id).map(|storage| storage.name())
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().kinds.len()
    }

    /// Returns `true` if no kind has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the typed store for `T`, registering the kind if needed.
    ///
    /// # Panics
    ///
    /// Panics if a different type already registered under `T::NAME`.
    #[must_use]
    pub fn store<T: Component>(&self) -> ComponentStore<T> {
        let id = self.register::<T>();
        let erased = self.storage(id).expect("registered kind has storage");
        let storage = erased
            .into_any()
            .downcast::<KindStorage<T>>()
            .unwrap_or_else(|_| panic!("component kind `{}` is bound to another type", T::NAME));
        ComponentStore { id, storage }
    }

    /// Returns `true` if `entity` holds an instance of kind `id`.
    #[must_use]
    pub fn contains(&self, id: ComponentKindId, entity: EntityId) -> bool {
        self.storage(id)
            .is_some_and(|storage| storage.contains(entity))
    }

    /// Entities currently holding an instance of kind `id`, in no particular order.
    #[must_use]
    pub fn entities_with(&self, id: ComponentKindId) -> Vec<EntityId> {
        self.storage(id)
            .map(|storage| storage.entities())
            .unwrap_or_default()
    }

    /// Number of instances stored for kind `id`.
    #[must_use]
    pub fn instance_count(&self, id: ComponentKindId) -> usize {
        self.storage(id).map_or(0, |storage| storage.len())
    }

    /// Computes which kinds `entity` currently holds.
    pub(crate) fn component_vector(&self, entity: EntityId) -> BitVector {
        let index = self.index.read();
        let mut bits = BitVector::new();
        for (id, storage) in index.kinds.iter().enumerate() {
            bits.set(id, storage.contains(entity));
        }
        bits
    }

    /// Removes `entity` from every kind. Returns how many instances were dropped.
    pub(crate) fn purge_entity(&self, entity: EntityId) -> usize {
        let kinds: Vec<_> = self.index.read().kinds.clone();
        kinds
            .iter()
            .filter(|storage| storage.remove(entity))
            .count()
    }

    fn storage(&self, id: ComponentKindId) -> Option<Arc<dyn ErasedStorage>> {
        self.index.read().kinds.get(id.index()).cloned()
    }

    fn lookup<T: Component>(&self) -> Option<ComponentKindId> {
        let index = self.index.read();
        let &id = index.by_name.get(T::NAME)?;
        assert_same_type::<T>(index.kinds[id.index()].as_ref());
        Some(id)
    }
}

fn assert_same_type<T: Component>(storage: &dyn ErasedStorage) {
    assert!(
        storage.component_type() == TypeId::of::<T>(),
        "component kind `{}` is already registered by another type",
        T::NAME
    );
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.index.read();
        f.debug_map()
            .entries(index.kinds.iter().enumerate().map(|(id, s)| (id, s.name())))
            .finish()
    }
}

/// Typed handle to one kind's instances.
///
/// Cheap to clone. Obtained from [`World::components`] or
/// [`ComponentRegistry::store`].
pub struct ComponentStore<T: Component> {
    id: ComponentKindId,
    storage: Arc<KindStorage<T>>,
}

impl<T: Component> ComponentStore<T> {
    /// Kind id of `T`.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ComponentKindId {
        self.id
    }

    /// Registration name of `T`.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        T::NAME
    }

    /// Adds a default `T` to `entity` and refreshes its subscriptions.
    ///
    /// If the entity already has a `T`, the existing instance is returned
    /// untouched and no update is issued.
    pub fn add(&self, world: &World, entity: EntityId) -> ComponentRef<T> {
        let (instance, created) = {
            let mut instances = self.storage.instances.write();
            match instances.get(&entity) {
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    let instance = Arc::new(RwLock::new(T::default()));
                    instances.insert(entity, Arc::clone(&instance));
                    (instance, true)
                }
            }
        };

        if created {
            world.update_entity(entity);
        }
        instance
    }

    /// Returns the instance attached to `entity`, if any.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<ComponentRef<T>> {
        self.storage.instances.read().get(&entity).cloned()
    }

    /// Returns `true` if `entity` has a `T`.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.storage.instances.read().contains_key(&entity)
    }

    /// Detaches `T` from `entity` and refreshes its subscriptions.
    ///
    /// The update is issued even when nothing was attached. Returns whether an
    /// instance was removed.
    pub fn remove(&self, world: &World, entity: EntityId) -> bool {
        let removed = self.storage.instances.write().remove(&entity).is_some();
        world.update_entity(entity);
        removed
    }

    /// Number of entities holding a `T`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.instances.read().len()
    }

    /// Returns `true` if no entity holds a `T`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Component> Clone for ComponentStore<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<T: Component> fmt::Debug for ComponentStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStore")
            .field("kind", &T::NAME)
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Position {
        x: f32,
    }

    impl Component for Position {
        const NAME: &'static str = "position";
    }

    #[derive(Default)]
    struct Velocity;

    impl Component for Velocity {
        const NAME: &'static str = "velocity";
    }

    #[derive(Default)]
    struct Imposter;

    impl Component for Imposter {
        const NAME: &'static str = "position";
    }

    #[test]
    fn test_registration_is_idempotent() {
        let registry = ComponentRegistry::new();
        let position = registry.register::<Position>();
        let velocity = registry.register::<Velocity>();

        assert_eq!(position.index(), 0);
        assert_eq!(velocity.index(), 1);
        assert_eq!(registry.register::<Position>(), position);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.kind_name(velocity), Some("velocity"));
        assert_eq!(registry.kind_id_by_name("position"), Some(position));
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let registry = ComponentRegistry::new();
        assert!(registry.kind_id::<Position>().is_none());
        assert!(registry.kind_name(ComponentKindId(9)).is_none());
        assert!(registry.entities_with(ComponentKindId(9)).is_empty());
        assert!(!registry.contains(ComponentKindId(9), EntityId::from_raw(1)));
        assert!(registry.is_empty());
    }

    #[test]
    #[should_panic(expected = "already registered by another type")]
    fn test_name_collision_panics() {
        let registry = ComponentRegistry::new();
        registry.register::<Position>();
        registry.register::<Imposter>();
    }

    #[test]
    fn test_component_vector_and_purge() {
        let registry = ComponentRegistry::new();
        let positions = registry.store::<Position>();
        let velocities = registry.store::<Velocity>();
        let entity = EntityId::from_raw(3);

        positions
            .storage
            .instances
            .write()
            .insert(entity, Arc::new(RwLock::new(Position { x: 1.0 })));

        let bits = registry.component_vector(entity);
        assert!(bits.get(positions.id().index()));
        assert!(!bits.get(velocities.id().index()));

        assert_eq!(registry.purge_entity(entity), 1);
        assert!(registry.component_vector(entity).is_empty());
        assert_eq!(registry.purge_entity(entity), 0);
    }
}
