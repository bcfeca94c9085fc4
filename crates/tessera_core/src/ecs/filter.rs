//! # Component Filters
//!
//! A filter is a predicate over an entity's component vector:
//!
//! ```text
//! required     -> entity must hold every kind
//! one_required -> entity must hold at least one kind
//! forbidden    -> entity must hold none of the kinds
//! ```
//!
//! An empty constraint is skipped, so a filter with no constraints at all
//! matches every entity.

use super::bitset::BitVector;
use super::component::{Component, ComponentKindId, ComponentRegistry};

/// Immutable component predicate.
///
/// Equality and hashing are structural, so two independently built filters
/// over the same kinds compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Filter {
    required: BitVector,
    one_required: BitVector,
    forbidden: BitVector,
}

impl Filter {
    /// Creates a filter from raw kind vectors.
    #[must_use]
    pub fn new(required: BitVector, one_required: BitVector, forbidden: BitVector) -> Self {
        Self {
            required,
            one_required,
            forbidden,
        }
    }

    /// Creates a filter from kind id lists.
    #[must_use]
    pub fn from_kinds(
        required: &[ComponentKindId],
        one_required: &[ComponentKindId],
        forbidden: &[ComponentKindId],
    ) -> Self {
        let bits =
            |ids: &[ComponentKindId]| -> BitVector { ids.iter().map(|id| id.index()).collect() };
        Self::new(bits(required), bits(one_required), bits(forbidden))
    }

    /// A filter that matches every entity.
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    /// Kinds that must all be present.
    #[inline]
    #[must_use]
    pub fn required(&self) -> &BitVector {
        &self.required
    }

    /// Kinds of which at least one must be present.
    #[inline]
    #[must_use]
    pub fn one_required(&self) -> &BitVector {
        &self.one_required
    }

    /// Kinds that must all be absent.
    #[inline]
    #[must_use]
    pub fn forbidden(&self) -> &BitVector {
        &self.forbidden
    }

    /// Returns `true` if an entity with `components` passes the filter.
    #[must_use]
    pub fn allow(&self, components: &BitVector) -> bool {
        if !self.required.is_empty() && !components.contains_all(&self.required) {
            return false;
        }

        if !self.one_required.is_empty() && !components.intersects(&self.one_required) {
            return false;
        }

        if !self.forbidden.is_empty() && components.intersects(&self.forbidden) {
            return false;
        }

        true
    }

    /// Returns `true` if an entity holding none of the referenced kinds passes.
    ///
    /// Such filters can admit entities that are invisible to a per-kind scan.
    #[must_use]
    pub fn matches_bare(&self) -> bool {
        self.required.is_empty() && self.one_required.is_empty()
    }

    /// Every kind the filter mentions, ascending and deduplicated.
    #[must_use]
    pub fn referenced_kinds(&self) -> Vec<usize> {
        let mut kinds: Vec<usize> = self
            .required
            .iter()
            .chain(self.one_required.iter())
            .chain(self.forbidden.iter())
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }
}

/// Chained construction of a [`Filter`] from component types.
///
/// Every named kind is registered on the spot, so building a filter before
/// any instance exists is fine.
///
/// ```rust
/// use tessera_core::{Component, World};
///
/// #[derive(Default)]
/// struct Position;
/// impl Component for Position { const NAME: &'static str = "position"; }
///
/// #[derive(Default)]
/// struct Frozen;
/// impl Component for Frozen { const NAME: &'static str = "frozen"; }
///
/// let world = World::new();
/// let filter = world.filter().require::<Position>().forbid::<Frozen>().build();
/// assert!(!filter.required().is_empty());
/// ```
pub struct FilterBuilder<'r> {
    registry: &'r ComponentRegistry,
    required: BitVector,
    one_required: BitVector,
    forbidden: BitVector,
}

impl<'r> FilterBuilder<'r> {
    /// Starts an empty builder against `registry`.
    #[must_use]
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            required: BitVector::new(),
            one_required: BitVector::new(),
            forbidden: BitVector::new(),
        }
    }

    /// Requires `T`.
    #[must_use]
    pub fn require<T: Component>(mut self) -> Self {
        let id = self.registry.register::<T>();
        self.required.set(id.index(), true);
        self
    }

    /// Adds `T` to the one-of set.
    #[must_use]
    pub fn require_one<T: Component>(mut self) -> Self {
        let id = self.registry.register::<T>();
        self.one_required.set(id.index(), true);
        self
    }

    /// Forbids `T`.
    #[must_use]
    pub fn forbid<T: Component>(mut self) -> Self {
        let id = self.registry.register::<T>();
        self.forbidden.set(id.index(), true);
        self
    }

    /// Requires an already registered kind.
    #[must_use]
    pub fn require_id(mut self, id: ComponentKindId) -> Self {
        self.required.set(id.index(), true);
        self
    }

    /// Adds an already registered kind to the one-of set.
    #[must_use]
    pub fn require_one_id(mut self, id: ComponentKindId) -> Self {
        self.one_required.set(id.index(), true);
        self
    }

    /// Forbids an already registered kind.
    #[must_use]
    pub fn forbid_id(mut self, id: ComponentKindId) -> Self {
        self.forbidden.set(id.index(), true);
        self
    }

    /// Finishes the filter.
    #[must_use]
    pub fn build(self) -> Filter {
        Filter::new(self.required, self.one_required, self.forbidden)
    }
}
