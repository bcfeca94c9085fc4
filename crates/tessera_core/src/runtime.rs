//! # Runtime
//!
//! Owns the shared [`World`] and the registered systems.
//!
//! ```text
//! add_system(system, activate)
//!   1. Initialize::init(world)             (if the system has it)
//!   2. Subscriber::filters -> subscriptions -> Subscriber::bind
//!   3. wrap in a SystemHandle at the system's rate (or the configured default)
//!   4. activate                            (if requested)
//! ```
//!
//! Dropping the runtime deactivates every system.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::ecs::World;
use crate::error::{TesseraError, TesseraResult};
use crate::schedule::clock::is_valid_frequency;
use crate::schedule::handle::WorkerOptions;
use crate::schedule::{System, SystemHandle};

/// A world plus the systems that run against it.
///
/// # Example
///
/// ```rust
/// use tessera_core::{FnSystem, Runtime, TickContext};
///
/// let runtime = Runtime::new();
/// let handle = runtime
///     .add_system(FnSystem::new("spawner", |ctx: &TickContext<'_>| {
///         ctx.world.new_entity();
///     }), false)
///     .unwrap();
///
/// handle.tick();
/// runtime.tick_all();
/// assert_eq!(runtime.world().entity_count(), 2);
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    world: Arc<World>,
    systems: RwLock<Vec<SystemHandle>>,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            world: Arc::new(World::new()),
            systems: RwLock::new(Vec::new()),
        }
    }

    /// Creates a runtime with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::InvalidConfig`] if the configuration fails validation.
    pub fn with_config(config: RuntimeConfig) -> TesseraResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            world: Arc::new(World::new()),
            systems: RwLock::new(Vec::new()),
        })
    }

    /// The shared world.
    #[inline]
    #[must_use]
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// The configuration this runtime was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Registers `system`, optionally starting it right away.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::InvalidConfig`] if the system's tick rate is
    /// negative or NaN; nothing is registered in that case.
    /// Returns [`TesseraError::ThreadSpawn`] if `activate` is set and the
    /// worker thread cannot be started. The system stays registered.
    pub fn add_system<S: System>(&self, system: S, activate: bool) -> TesseraResult<SystemHandle> {
        let mut system: Box<dyn System> = Box::new(system);

        let frequency = system.tick_rate().unwrap_or(self.config.default_tick_rate);
        if !is_valid_frequency(frequency) {
            return Err(TesseraError::InvalidConfig(format!(
                "system `{}` has tick rate {frequency}, expected zero or positive",
                system.name()
            )));
        }

        if let Some(initializer) = system.initializer() {
            initializer.init(&self.world);
        }

        if let Some(subscriber) = system.subscriber() {
            let subscriptions = subscriber
                .filters(&self.world)
                .into_iter()
                .map(|filter| self.world.add_subscription(filter))
                .collect();
            subscriber.bind(subscriptions);
        }

        let options = WorkerOptions::new(&self.config, system.name());
        let handle = SystemHandle::new(system, Arc::clone(&self.world), frequency, options);

        self.systems.write().push(handle.clone());
        debug!(system = handle.name(), frequency, "registered system");

        if activate {
            handle.activate()?;
        }
        Ok(handle)
    }

    /// Handles of every registered system, in registration order.
    #[must_use]
    pub fn systems(&self) -> Vec<SystemHandle> {
        self.systems.read().clone()
    }

    /// Number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.read().len()
    }

    /// The first registered system called `name`.
    #[must_use]
    pub fn system(&self, name: &str) -> Option<SystemHandle> {
        self.systems
            .read()
            .iter()
            .find(|handle| handle.name() == name)
            .cloned()
    }

    /// Starts the system called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::SystemNotFound`] if no such system is registered,
    /// or [`TesseraError::ThreadSpawn`] if its worker cannot be started.
    pub fn activate_system(&self, name: &str) -> TesseraResult<()> {
        self.require(name)?.activate()
    }

    /// Stops the system called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::SystemNotFound`] if no such system is registered.
    pub fn deactivate_system(&self, name: &str) -> TesseraResult<()> {
        self.require(name)?.deactivate();
        Ok(())
    }

    /// Stops and unregisters the system called `name`, returning its handle.
    ///
    /// Subscriptions it created stay in the world; other systems may share them.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::SystemNotFound`] if no such system is registered.
    pub fn remove_system(&self, name: &str) -> TesseraResult<SystemHandle> {
        let handle = {
            let mut systems = self.systems.write();
            let position = systems
                .iter()
                .position(|handle| handle.name() == name)
                .ok_or_else(|| TesseraError::SystemNotFound(name.to_owned()))?;
            systems.remove(position)
        };

        handle.deactivate();
        debug!(system = name, "removed system");
        Ok(handle)
    }

    /// Ticks every registered system once on the calling thread, in
    /// registration order.
    ///
    /// A cooperative alternative to worker threads; active systems keep their
    /// own schedule on top of this.
    pub fn tick_all(&self) {
        for handle in self.systems() {
            handle.tick();
        }
    }

    /// Deactivates every system. Systems stay registered.
    pub fn shutdown(&self) {
        for handle in self.systems() {
            handle.deactivate();
        }
    }

    fn require(&self, name: &str) -> TesseraResult<SystemHandle> {
        self.system(name)
            .ok_or_else(|| TesseraError::SystemNotFound(name.to_owned()))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("world", &self.world)
            .field("systems", &self.system_count())
            .finish_non_exhaustive()
    }
}
