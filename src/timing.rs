// Timing module - Injected millisecond clock and non-blocking interval timers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic milliseconds source. Every timer in the engine polls one of these.
pub trait Clock: Send + Sync {
    fn millis(&self) -> u64;
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        ManualClock { now: Arc::new(AtomicU64::new(start)) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Fires once strictly more than `interval` ms have passed since it last fired.
/// A check that does not fire changes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntervalTimer {
    previous: u64,
}

impl IntervalTimer {
    pub fn new() -> Self {
        IntervalTimer { previous: 0 }
    }

    pub fn ready(&mut self, now: u64, interval: u64) -> bool {
        if now.saturating_sub(self.previous) > interval {
            self.previous = now;
            true
        } else {
            false
        }
    }
}

/// Periodic toggle that fires on its first check and then every `interval` ms.
#[derive(Clone, Copy, Debug)]
pub struct Cadence {
    pub interval: u64,
    pub enabled: bool,
    previous: Option<u64>,
}

impl Cadence {
    pub fn new(interval: u64) -> Self {
        Cadence { interval, enabled: false, previous: None }
    }

    pub fn configure(&mut self, interval: u64, enabled: bool) {
        self.interval = interval;
        self.enabled = enabled;
        self.previous = None;
    }

    pub fn due(&mut self, now: u64) -> bool {
        if !self.enabled {
            return false;
        }
        match self.previous {
            Some(prev) if now.saturating_sub(prev) < self.interval => false,
            _ => {
                self.previous = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_timer_is_strict() {
        let mut timer = IntervalTimer::new();
        assert!(!timer.ready(20, 20));
        assert!(timer.ready(21, 20));
        assert!(!timer.ready(41, 20));
        assert!(timer.ready(42, 20));
    }

    #[test]
    fn test_cadence_fires_immediately_then_waits() {
        let mut cadence = Cadence::new(1000);
        assert!(!cadence.due(0));
        cadence.configure(1000, true);
        assert!(cadence.due(5));
        assert!(!cadence.due(900));
        assert!(cadence.due(1005));
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(10);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.millis(), 15);
        other.set(100);
        assert_eq!(clock.millis(), 100);
    }
}
