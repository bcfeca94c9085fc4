//! # System Traits
//!
//! A system is a unit of per-tick logic. Extra capabilities are separate
//! traits, exposed through accessor methods on [`System`] so a boxed system
//! can be asked for them without downcasting:
//!
//! ```text
//! System      - update once per tick            (required)
//! Initialize  - one-time setup against a world  (optional)
//! Subscriber  - filters turned into subscriptions at registration (optional)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::ecs::{Filter, Subscription, World};

/// Everything a system sees during one tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    /// The world the system was registered with.
    pub world: &'a World,
    /// Time since the previous tick of this system.
    pub delta: Duration,
    /// One-based number of the tick in progress.
    pub tick: u64,
}

impl fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickContext")
            .field("delta", &self.delta)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

/// Per-tick logic.
///
/// # Example
///
/// ```rust
/// use tessera_core::{System, TickContext};
///
/// struct Counter(u64);
///
/// impl System for Counter {
///     fn name(&self) -> &str {
///         "counter"
///     }
///
///     fn update(&mut self, _ctx: &TickContext<'_>) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait System: Send + 'static {
    /// Display name, also the lookup key inside a runtime.
    fn name(&self) -> &str;

    /// Runs one tick.
    fn update(&mut self, ctx: &TickContext<'_>);

    /// Preferred ticks per second. `None` uses the runtime default, zero is uncapped.
    fn tick_rate(&self) -> Option<f64> {
        None
    }

    /// The system's [`Initialize`] capability, if it has one.
    fn initializer(&mut self) -> Option<&mut dyn Initialize> {
        None
    }

    /// The system's [`Subscriber`] capability, if it has one.
    fn subscriber(&mut self) -> Option<&mut dyn Subscriber> {
        None
    }
}

/// One-time setup, run when the system is added to a runtime.
pub trait Initialize {
    /// Prepares the system against `world`.
    fn init(&mut self, world: &World);
}

/// Declares filters that become subscriptions at registration.
pub trait Subscriber {
    /// Filters this system wants to track.
    fn filters(&self, world: &World) -> Vec<Filter>;

    /// Receives one subscription per filter, in the same order.
    fn bind(&mut self, subscriptions: Vec<Arc<Subscription>>);
}

/// Holder for the subscriptions handed to a [`Subscriber`].
///
/// Reading before [`Subscriber::bind`] ran is a programming error and panics.
#[derive(Debug, Default)]
pub struct SubscriptionSlots {
    bound: Option<Vec<Arc<Subscription>>>,
}

impl SubscriptionSlots {
    /// Creates unbound slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the subscriptions received in [`Subscriber::bind`].
    pub fn bind(&mut self, subscriptions: Vec<Arc<Subscription>>) {
        self.bound = Some(subscriptions);
    }

    /// Returns `true` once bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The subscription for the filter at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the slots are not bound yet or `index` is out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> &Arc<Subscription> {
        let bound = self
            .bound
            .as_ref()
            .unwrap_or_else(|| panic!("subscription accessed before the system was registered"));
        bound.get(index).unwrap_or_else(|| {
            panic!(
                "subscription {index} requested but only {} filters were declared",
                bound.len()
            )
        })
    }

    /// All bound subscriptions.
    ///
    /// # Panics
    ///
    /// Panics if the slots are not bound yet.
    #[must_use]
    pub fn all(&self) -> &[Arc<Subscription>] {
        self.bound
            .as_deref()
            .unwrap_or_else(|| panic!("subscription accessed before the system was registered"))
    }
}

/// A [`System`] backed by a closure.
///
/// ```rust
/// use tessera_core::{FnSystem, System, TickContext};
///
/// let system = FnSystem::new("noop", |_ctx: &TickContext<'_>| {}).with_tick_rate(30.0);
/// assert_eq!(system.name(), "noop");
/// assert_eq!(system.tick_rate(), Some(30.0));
/// ```
pub struct FnSystem<F> {
    name: String,
    tick_rate: Option<f64>,
    update: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&TickContext<'_>) + Send + 'static,
{
    /// Wraps `update` as a system called `name`.
    pub fn new(name: impl Into<String>, update: F) -> Self {
        Self {
            name: name.into(),
            tick_rate: None,
            update,
        }
    }

    /// Sets the preferred tick rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = Some(tick_rate);
        self
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&TickContext<'_>) + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, ctx: &TickContext<'_>) {
        (self.update)(ctx);
    }

    fn tick_rate(&self) -> Option<f64> {
        self.tick_rate
    }
}

impl<F> fmt::Debug for FnSystem<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSystem")
            .field("name", &self.name)
            .field("tick_rate", &self.tick_rate)
            .finish_non_exhaustive()
    }
}
