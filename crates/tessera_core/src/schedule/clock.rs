//! # Tick Clock
//!
//! Per-system tick bookkeeping: frequency, elapsed time between ticks,
//! accumulated uptime and tick duration statistics.
//!
//! The clock does not wait by itself. The worker thread turns
//! [`TickClock::period`] into a deadline on its stop channel; manual ticks use
//! the clock directly.

use std::time::{Duration, Instant};

/// Tick rate used when neither the system nor the configuration picks one.
pub const DEFAULT_TICK_RATE: f64 = 100.0;

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Minimum tick duration observed.
    pub min_tick_us: u64,
    /// Maximum tick duration observed.
    pub max_tick_us: u64,
    /// Average tick duration (rolling).
    pub avg_tick_us: u64,
    /// Number of late ticks (took longer than the period).
    pub late_ticks: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
}

impl Default for TickStats {
    fn default() -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: 0,
            late_ticks: 0,
            total_ticks: 0,
        }
    }
}

impl TickStats {
    fn record(&mut self, duration: Duration, late: bool) {
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        self.min_tick_us = self.min_tick_us.min(duration_us);
        self.max_tick_us = self.max_tick_us.max(duration_us);
        self.avg_tick_us = if self.total_ticks == 0 {
            duration_us
        } else {
            // Rolling average
            (self.avg_tick_us.saturating_mul(15).saturating_add(duration_us)) / 16
        };
        self.total_ticks += 1;

        if late {
            self.late_ticks += 1;
        }
    }
}

/// Marker returned by [`TickClock::begin_tick`].
#[derive(Clone, Copy, Debug)]
pub struct TickStart {
    started: Instant,
    delta: Duration,
}

impl TickStart {
    /// Time since the previous tick began.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// When this tick began.
    #[inline]
    #[must_use]
    pub fn started(&self) -> Instant {
        self.started
    }
}

/// Variable-rate tick controller for one system.
#[derive(Clone, Debug)]
pub struct TickClock {
    /// Ticks per second, zero = uncapped.
    frequency: f64,
    /// Start of the previous tick, or of the clock.
    last_tick: Instant,
    /// Completed ticks.
    tick_count: u64,
    /// Sum of all tick deltas.
    uptime: Duration,
    /// Delta of the most recent tick.
    elapsed: Duration,
    stats: TickStats,
}

impl TickClock {
    /// Creates a clock at `frequency` ticks per second.
    ///
    /// # Panics
    ///
    /// Panics if `frequency` is negative or NaN.
    #[must_use]
    pub fn new(frequency: f64) -> Self {
        assert_valid_frequency(frequency);
        Self {
            frequency,
            last_tick: Instant::now(),
            tick_count: 0,
            uptime: Duration::ZERO,
            elapsed: Duration::ZERO,
            stats: TickStats::default(),
        }
    }

    /// Ticks per second. Zero means uncapped.
    #[inline]
    #[must_use]
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Changes the tick rate. Takes effect from the next scheduled tick.
    ///
    /// # Panics
    ///
    /// Panics if `frequency` is negative or NaN.
    pub fn set_frequency(&mut self, frequency: f64) {
        assert_valid_frequency(frequency);
        self.frequency = frequency;
    }

    /// Target time between tick starts. `None` when uncapped.
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        period_of(self.frequency)
    }

    /// Restarts delta measurement from now.
    ///
    /// Called on activation so time spent inactive does not show up as one
    /// huge delta.
    pub fn resync(&mut self) {
        self.last_tick = Instant::now();
    }

    /// Marks the start of a tick.
    #[must_use]
    pub fn begin_tick(&self) -> TickStart {
        let started = Instant::now();
        TickStart {
            started,
            delta: started.saturating_duration_since(self.last_tick),
        }
    }

    /// Marks the end of a tick and records its statistics.
    ///
    /// Returns `true` if the tick ran longer than the period.
    pub fn end_tick(&mut self, start: TickStart) -> bool {
        let duration = start.started.elapsed();
        let late = self.period().is_some_and(|period| duration > period);

        self.tick_count += 1;
        self.elapsed = start.delta;
        self.uptime += start.delta;
        self.last_tick = start.started;
        self.stats.record(duration, late);
        late
    }

    /// Completed ticks.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Sum of the deltas of every completed tick.
    #[inline]
    #[must_use]
    pub const fn uptime(&self) -> Duration {
        self.uptime
    }

    /// Delta of the most recent tick.
    #[inline]
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Tick duration statistics.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::default();
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}

/// Period for a rate in ticks per second. `None` for zero or infinity.
#[must_use]
pub fn period_of(frequency: f64) -> Option<Duration> {
    if frequency <= 0.0 || !frequency.is_finite() {
        return None;
    }
    Some(Duration::from_secs_f64(1.0 / frequency))
}

/// `true` for zero (uncapped) and positive rates. NaN is rejected.
#[inline]
#[must_use]
pub fn is_valid_frequency(frequency: f64) -> bool {
    frequency >= 0.0
}

fn assert_valid_frequency(frequency: f64) {
    assert!(
        is_valid_frequency(frequency),
        "tick frequency must be zero or positive, got {frequency}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_creation() {
        let clock = TickClock::default();
        assert_eq!(clock.tick_count(), 0);
        assert_eq!(clock.frequency(), DEFAULT_TICK_RATE);
        assert_eq!(clock.period(), Some(Duration::from_millis(10)));
        assert_eq!(clock.uptime(), Duration::ZERO);
    }

    #[test]
    fn test_uncapped_has_no_period() {
        let mut clock = TickClock::new(0.0);
        assert_eq!(clock.period(), None);

        clock.set_frequency(f64::INFINITY);
        assert_eq!(clock.period(), None);

        clock.set_frequency(4.0);
        assert_eq!(clock.period(), Some(Duration::from_millis(250)));
    }

    #[test]
    #[should_panic(expected = "tick frequency must be zero or positive")]
    fn test_negative_frequency_panics() {
        let _ = TickClock::new(-1.0);
    }

    #[test]
    fn test_bookkeeping() {
        let mut clock = TickClock::new(1000.0);

        thread::sleep(Duration::from_millis(2));
        let start = clock.begin_tick();
        assert!(start.delta() >= Duration::from_millis(2));
        clock.end_tick(start);

        let start = clock.begin_tick();
        clock.end_tick(start);

        assert_eq!(clock.tick_count(), 2);
        assert!(clock.uptime() >= Duration::from_millis(2));
        assert!(clock.elapsed() <= clock.uptime());
        assert_eq!(clock.stats().total_ticks, 2);
        assert!(clock.stats().min_tick_us <= clock.stats().max_tick_us);
    }

    #[test]
    fn test_late_tick_detection() {
        let mut clock = TickClock::new(1000.0);

        let start = clock.begin_tick();
        thread::sleep(Duration::from_millis(3));
        assert!(clock.end_tick(start));
        assert_eq!(clock.stats().late_ticks, 1);

        clock.reset_stats();
        assert_eq!(clock.stats().late_ticks, 0);
        assert_eq!(clock.tick_count(), 1);
    }
}
