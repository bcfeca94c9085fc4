//! # Scheduling
//!
//! Every active system runs on its own OS thread at its own rate. There is no
//! global frame and no barrier between systems; they meet only at the locks
//! inside the [`World`](crate::World).

pub mod clock;
pub mod handle;
pub mod system;

pub use clock::{TickClock, TickStart, TickStats, DEFAULT_TICK_RATE};
pub use handle::SystemHandle;
pub use system::{FnSystem, Initialize, Subscriber, SubscriptionSlots, System, TickContext};
