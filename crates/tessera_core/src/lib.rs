//! # Tessera Core
//!
//! Concurrent Entity Component System with per-system scheduling:
//! - Entities are bare ids; components live in one store per kind
//! - Subscriptions keep filter results current as components come and go
//! - Every active system ticks on its own thread at its own rate
//!
//! ## Architecture
//!
//! ```text
//! BitVector ─> ComponentRegistry ─> Filter ─> Subscription ─> World
//!                                                               │
//!                  System / Initialize / Subscriber ─> Runtime ─> SystemHandle
//!                                                                 (1 thread each)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Component, Runtime};
//!
//! #[derive(Default)]
//! struct Position { x: f32 }
//! impl Component for Position { const NAME: &'static str = "position"; }
//!
//! #[derive(Default)]
//! struct Velocity { dx: f32 }
//! impl Component for Velocity { const NAME: &'static str = "velocity"; }
//!
//! let runtime = Runtime::new();
//! let world = runtime.world();
//!
//! let moving = world.add_subscription(
//!     world.filter().require::<Position>().require::<Velocity>().build(),
//! );
//!
//! let entity = world.new_entity();
//! world.components::<Position>().add(world, entity);
//! world.components::<Velocity>().add(world, entity).write().dx = 1.5;
//!
//! for id in moving.entities().iter() {
//!     let dx = world.components::<Velocity>().get(*id).unwrap().read().dx;
//!     world.components::<Position>().get(*id).unwrap().write().x += dx;
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod runtime;
pub mod schedule;

pub use config::RuntimeConfig;
pub use ecs::{
    BitVector, Component, ComponentKindId, ComponentRef, ComponentRegistry, ComponentStore,
    EntityId, Filter, FilterBuilder, Subscription, World,
};
pub use error::{TesseraError, TesseraResult};
pub use runtime::Runtime;
pub use schedule::{
    FnSystem, Initialize, Subscriber, SubscriptionSlots, System, SystemHandle, TickContext,
    TickStats, DEFAULT_TICK_RATE,
};
