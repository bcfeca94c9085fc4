//! # System Handles
//!
//! A [`SystemHandle`] owns one registered system and, while active, the OS
//! thread that drives it.
//!
//! ## Worker Loop
//!
//! ```text
//! loop:
//!   wait on stop channel until next deadline
//!     ├─ stop received / sender dropped ─> exit
//!     └─ deadline reached ───────────────> tick
//!   tick = pre-hook -> update -> post-hook -> bookkeeping
//!   next deadline = tick start + period   (uncapped: now)
//! ```
//!
//! The stop channel doubles as the timer, so deactivation never waits out a
//! full period. An in-flight tick always completes. Manual ticks and worker
//! ticks share one gate and never overlap.
//!
//! ## Locking
//!
//! The gate is held for a whole tick. The clock is locked only around
//! `begin_tick`/`end_tick`, the system only around `update`, and each hook
//! only around its own call. Hooks and updates may therefore read the
//! handle's timing, change its frequency, or deactivate it.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::clock::{TickClock, TickStats};
use super::system::{System, TickContext};
use crate::config::RuntimeConfig;
use crate::ecs::World;
use crate::error::{TesseraError, TesseraResult};

type TickHook = Arc<Mutex<dyn FnMut(&TickContext<'_>) + Send>>;

/// Worker thread settings taken from the runtime configuration.
#[derive(Clone, Debug)]
pub(crate) struct WorkerOptions {
    pub(crate) thread_name: String,
    pub(crate) stack_size: Option<usize>,
    pub(crate) late_tick_warnings: bool,
}

impl WorkerOptions {
    pub(crate) fn new(config: &RuntimeConfig, system: &str) -> Self {
        Self {
            thread_name: format!("{}-{system}", config.thread_name_prefix),
            stack_size: config.worker_stack_size,
            late_tick_warnings: config.late_tick_warnings,
        }
    }
}

#[derive(Default)]
struct Hooks {
    pre_tick: Option<TickHook>,
    post_tick: Option<TickHook>,
}

struct Worker {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

struct Shared {
    name: String,
    world: Arc<World>,
    options: WorkerOptions,
    gate: Mutex<()>,
    system: Mutex<Box<dyn System>>,
    clock: Mutex<TickClock>,
    hooks: Mutex<Hooks>,
    worker: Mutex<Option<Worker>>,
}

/// Handle to a registered system.
///
/// Cheap to clone; every clone controls the same system.
#[derive(Clone)]
pub struct SystemHandle {
    shared: Arc<Shared>,
}

impl SystemHandle {
    pub(crate) fn new(
        system: Box<dyn System>,
        world: Arc<World>,
        frequency: f64,
        options: WorkerOptions,
    ) -> Self {
        let name = system.name().to_owned();
        Self {
            shared: Arc::new(Shared {
                name,
                world,
                options,
                gate: Mutex::new(()),
                system: Mutex::new(system),
                clock: Mutex::new(TickClock::new(frequency)),
                hooks: Mutex::new(Hooks::default()),
                worker: Mutex::new(None),
            }),
        }
    }

    /// The system's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Starts the system's worker thread. Does nothing if already running.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::ThreadSpawn`] if the OS refuses the thread.
    pub fn activate(&self) -> TesseraResult<()> {
        let mut slot = self.shared.worker.lock();
        if let Some(worker) = slot.as_ref() {
            if !worker.thread.is_finished() {
                return Ok(());
            }
        }
        // reap a worker that stopped on its own
        if let Some(stale) = slot.take() {
            reap(&self.shared.name, stale.thread);
        }

        let (stop, stop_rx) = bounded(1);
        let mut builder = thread::Builder::new().name(self.shared.options.thread_name.clone());
        if let Some(size) = self.shared.options.stack_size {
            builder = builder.stack_size(size);
        }

        let shared = Arc::clone(&self.shared);
        let thread = builder
            .spawn(move || run_worker(&shared, &stop_rx))
            .map_err(|source| TesseraError::ThreadSpawn {
                system: self.shared.name.clone(),
                source,
            })?;

        *slot = Some(Worker { stop, thread });
        debug!(system = %self.shared.name, "activated system");
        Ok(())
    }

    /// Stops the worker thread after its in-flight tick completes.
    ///
    /// Blocks until the thread exited, unless called from that thread (a
    /// system deactivating itself). Does nothing if not running.
    ///
    /// Must not be called from a manual [`tick`](Self::tick) of the same
    /// system while its worker runs: the worker would wait for that tick.
    pub fn deactivate(&self) {
        let Some(worker) = self.shared.worker.lock().take() else {
            return;
        };

        // a full buffer means a stop is already pending
        let _ = worker.stop.try_send(());

        if worker.thread.thread().id() == current_thread() {
            debug!(system = %self.shared.name, "system deactivated itself");
            return;
        }
        reap(&self.shared.name, worker.thread);
        debug!(system = %self.shared.name, "deactivated system");
    }

    /// Returns `true` while the worker thread is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared
            .worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.thread.is_finished())
    }

    /// Runs exactly one tick on the calling thread.
    ///
    /// Works whether or not the system is active. Must not be called from the
    /// system's own hooks or update.
    pub fn tick(&self) {
        run_tick(&self.shared);
    }

    // =========================================================================
    // Timing
    // =========================================================================

    /// Ticks per second. Zero means uncapped.
    #[must_use]
    pub fn tick_frequency(&self) -> f64 {
        self.shared.clock.lock().frequency()
    }

    /// Changes the tick rate; a running worker picks it up after its next tick.
    ///
    /// May be called by the system from inside its own tick.
    ///
    /// # Panics
    ///
    /// Panics if `frequency` is negative or NaN.
    pub fn set_tick_frequency(&self, frequency: f64) {
        self.shared.clock.lock().set_frequency(frequency);
    }

    /// Target time between ticks. `None` when uncapped.
    #[must_use]
    pub fn tick_period(&self) -> Option<Duration> {
        self.shared.clock.lock().period()
    }

    /// Completed ticks, manual and scheduled.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.shared.clock.lock().tick_count()
    }

    /// Sum of all tick deltas.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.shared.clock.lock().uptime()
    }

    /// Delta of the most recent tick.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.shared.clock.lock().elapsed()
    }

    /// Tick duration statistics.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        *self.shared.clock.lock().stats()
    }

    // =========================================================================
    // Hooks
    // =========================================================================

    /// Runs `hook` before every update.
    pub fn set_pre_tick_hook<F>(&self, hook: F)
    where
        F: FnMut(&TickContext<'_>) + Send + 'static,
    {
        self.shared.hooks.lock().pre_tick = Some(Arc::new(Mutex::new(hook)));
    }

    /// Runs `hook` after every update.
    pub fn set_post_tick_hook<F>(&self, hook: F)
    where
        F: FnMut(&TickContext<'_>) + Send + 'static,
    {
        self.shared.hooks.lock().post_tick = Some(Arc::new(Mutex::new(hook)));
    }

    /// Removes both hooks.
    pub fn clear_hooks(&self) {
        *self.shared.hooks.lock() = Hooks::default();
    }

    /// Runs `f` with exclusive access to the system, outside its update.
    ///
    /// Callable from the hooks. Must not be called from the system's own
    /// update, which already holds it.
    pub fn with_system<R>(&self, f: impl FnOnce(&mut dyn System) -> R) -> R {
        let mut system = self.shared.system.lock();
        f(system.as_mut())
    }
}

impl fmt::Debug for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemHandle")
            .field("name", &self.shared.name)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

fn current_thread() -> ThreadId {
    thread::current().id()
}

fn reap(name: &str, thread: JoinHandle<()>) {
    if thread.join().is_err() {
        warn!(system = %name, "worker thread panicked");
    }
}

fn warn_late(name: &str, clock: &TickClock) {
    let stats = clock.stats();
    warn!(
        system = %name,
        tick = clock.tick_count(),
        budget_us = clock.period().map_or(0, |p| u64::try_from(p.as_micros()).unwrap_or(u64::MAX)),
        max_tick_us = stats.max_tick_us,
        late_ticks = stats.late_ticks,
        "tick overran its period"
    );
}

/// Executes one tick: pre-hook, update, post-hook, bookkeeping.
///
/// Returns the period to wait before the next tick.
fn run_tick(shared: &Shared) -> Option<Duration> {
    let _gate = shared.gate.lock();

    let (start, tick) = {
        let clock = shared.clock.lock();
        (clock.begin_tick(), clock.tick_count() + 1)
    };
    let ctx = TickContext {
        world: &shared.world,
        delta: start.delta(),
        tick,
    };

    let pre_tick = shared.hooks.lock().pre_tick.clone();
    if let Some(hook) = pre_tick {
        (&mut *hook.lock())(&ctx);
    }
    shared.system.lock().update(&ctx);
    let post_tick = shared.hooks.lock().post_tick.clone();
    if let Some(hook) = post_tick {
        (&mut *hook.lock())(&ctx);
    }

    let mut clock = shared.clock.lock();
    let late = clock.end_tick(start);
    if late && shared.options.late_tick_warnings {
        warn_late(&shared.name, &clock);
    }
    trace!(tick = ctx.tick, delta = ?ctx.delta, "tick complete");
    clock.period()
}

fn run_worker(shared: &Shared, stop: &Receiver<()>) {
    shared.clock.lock().resync();
    let mut deadline = Instant::now();

    loop {
        match stop.recv_deadline(deadline) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_tick(shared)));

        match outcome {
            Ok(Some(period)) => deadline = started + period,
            Ok(None) => deadline = Instant::now(),
            Err(payload) => {
                warn!(
                    system = %shared.name,
                    reason = panic_message(&*payload),
                    "system panicked during tick, stopping worker"
                );
                break;
            }
        }
    }

    trace!(system = %shared.name, "worker exited");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
