//! # Entity Component System
//!
//! Entities are bare ids, components live in per-kind stores, and
//! subscriptions keep the set of entities matching a filter up to date as
//! components come and go.

pub mod bitset;
pub mod component;
pub mod entity;
pub mod filter;
pub mod subscription;
pub mod world;

pub use bitset::BitVector;
pub use component::{Component, ComponentKindId, ComponentRef, ComponentRegistry, ComponentStore};
pub use entity::{EntityAllocator, EntityId};
pub use filter::{Filter, FilterBuilder};
pub use subscription::Subscription;
pub use world::World;
