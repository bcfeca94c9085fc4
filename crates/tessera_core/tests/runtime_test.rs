//! Integration test for runtime scheduling and configuration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tessera_core::{FnSystem, Runtime, RuntimeConfig, TesseraError, TickContext};

fn temp_config_path() -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tessera_runtime_{id}.toml"))
}

fn wait_for(counter: &AtomicU64, at_least: u64) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if counter.load(Ordering::SeqCst) >= at_least {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn counting_system(
    name: &str,
    rate: f64,
) -> (FnSystem<impl FnMut(&TickContext<'_>) + Send + 'static>, Arc<AtomicU64>) {
    let count = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&count);
    let system = FnSystem::new(name, move |_ctx: &TickContext<'_>| {
        sink.fetch_add(1, Ordering::SeqCst);
    })
    .with_tick_rate(rate);
    (system, count)
}

#[test]
fn test_systems_tick_independently() {
    let runtime = Runtime::new();
    let (fast, fast_count) = counting_system("fast", 1000.0);
    let (slow, slow_count) = counting_system("slow", 2.0);

    runtime.add_system(fast, true).unwrap();
    runtime.add_system(slow, true).unwrap();

    assert!(wait_for(&fast_count, 50));
    runtime.shutdown();

    // the slow system ticked once on activation and at most once more
    assert!(slow_count.load(Ordering::SeqCst) <= 2);
    assert!(fast_count.load(Ordering::SeqCst) >= 50);
}

#[test]
fn test_tick_all_runs_in_registration_order() {
    let runtime = Runtime::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
        let log = Arc::clone(&order);
        runtime
            .add_system(
                FnSystem::new(name, move |_ctx: &TickContext<'_>| log.lock().push(name)),
                false,
            )
            .unwrap();
    }

    runtime.tick_all();
    runtime.tick_all();
    assert_eq!(
        *order.lock(),
        vec!["first", "second", "third", "first", "second", "third"]
    );
}

#[test]
fn test_hooks_wrap_update() {
    let runtime = Runtime::new();
    let events = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&events);
    let handle = runtime
        .add_system(
            FnSystem::new("hooked", move |ctx: &TickContext<'_>| {
                log.lock().push(format!("update {}", ctx.tick));
            }),
            false,
        )
        .unwrap();

    let log = Arc::clone(&events);
    handle.set_pre_tick_hook(move |ctx| log.lock().push(format!("pre {}", ctx.tick)));
    let log = Arc::clone(&events);
    handle.set_post_tick_hook(move |ctx| log.lock().push(format!("post {}", ctx.tick)));

    handle.tick();
    handle.tick();

    assert_eq!(
        *events.lock(),
        vec!["pre 1", "update 1", "post 1", "pre 2", "update 2", "post 2"]
    );
    assert_eq!(handle.tick_count(), 2);
    assert!(handle.uptime() >= handle.elapsed());
}

#[test]
fn test_frequency_change_while_running() {
    let runtime = Runtime::new();
    let (system, count) = counting_system("adjustable", 1.0);
    let handle = runtime.add_system(system, true).unwrap();

    // first tick is immediate, the next one is a second away
    assert!(wait_for(&count, 1));
    handle.set_tick_frequency(1000.0);
    assert_eq!(handle.tick_period(), Some(Duration::from_millis(1)));

    // the new rate applies once the pending period elapses
    assert!(wait_for(&count, 20));
    runtime.remove_system("adjustable").unwrap();
    assert!(!handle.is_active());
}

#[test]
fn test_stats_are_recorded() {
    let runtime = Runtime::new();
    let (system, _) = counting_system("measured", 100.0);
    let handle = runtime.add_system(system, false).unwrap();

    for _ in 0..5 {
        handle.tick();
    }
    let stats = handle.stats();
    assert_eq!(stats.total_ticks, 5);
    assert!(stats.min_tick_us <= stats.max_tick_us);
}

#[test]
fn test_config_file_drives_runtime() {
    let path = temp_config_path();
    std::fs::write(
        &path,
        "default_tick_rate = 250.0\nthread_name_prefix = \"sim\"\nlate_tick_warnings = false\n",
    )
    .unwrap();

    let config = RuntimeConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let runtime = Runtime::with_config(config).unwrap();
    let handle = runtime
        .add_system(FnSystem::new("defaulted", |_ctx: &TickContext<'_>| {}), false)
        .unwrap();

    assert_eq!(handle.tick_period(), Some(Duration::from_millis(4)));
    assert_eq!(runtime.config().thread_name_prefix, "sim");
}

#[test]
fn test_worker_thread_is_named() {
    let config = RuntimeConfig {
        thread_name_prefix: "named".to_owned(),
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::with_config(config).unwrap();
    let seen = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&seen);
    runtime
        .add_system(
            FnSystem::new("watcher", move |_ctx: &TickContext<'_>| {
                *sink.lock() = thread::current().name().map(str::to_owned);
            }),
            true,
        )
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while seen.lock().is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    runtime.shutdown();

    assert_eq!(seen.lock().as_deref(), Some("named-watcher"));
}

#[test]
fn test_missing_config_file() {
    let err = RuntimeConfig::load(temp_config_path()).unwrap_err();
    assert!(matches!(err, TesseraError::Io { .. }));
}
