//! Clock and timer facilities
//!
//! Time is counted in wrapping 32-bit platform ticks. Short protocol delays
//! (ack sampling, inter-frame spacing) are bounded spin-waits on a [`Clock`];
//! the duty-cycle phases are driven by a one-shot [`Timer`] that calls back
//! into the driver.

use std::time::Instant;

/// Platform clock ticks
pub type Ticks = u32;

/// Monotonic tick source
pub trait Clock {
    fn now(&self) -> Ticks;

    fn ticks_per_second(&self) -> u32;
}

/// One-shot timer facility.
///
/// `schedule` arms the timer to fire `after` ticks from now, replacing any
/// earlier arming. When it fires, the host calls `Plb::on_timer`.
pub trait Timer {
    fn schedule(&mut self, after: Ticks);
}

/// Wrapping "a is before b" comparison
pub fn clock_lt(a: Ticks, b: Ticks) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Spins on `clock` until `interval` ticks have elapsed
pub fn hold<C: Clock + ?Sized>(clock: &C, interval: Ticks) {
    let start = clock.now();
    let deadline = start.wrapping_add(interval);
    while clock_lt(clock.now(), deadline) {
        std::hint::spin_loop();
    }
}

/// Microsecond clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub const TICKS_PER_SECOND: u32 = 1_000_000;

    pub fn new() -> Self {
        SystemClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Ticks {
        // Truncation gives the wrapping tick counter
        self.epoch.elapsed().as_micros() as Ticks
    }

    fn ticks_per_second(&self) -> u32 {
        Self::TICKS_PER_SECOND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct SteppingClock(Cell<Ticks>);

    impl Clock for SteppingClock {
        fn now(&self) -> Ticks {
            let now = self.0.get();
            self.0.set(now.wrapping_add(10));
            now
        }

        fn ticks_per_second(&self) -> u32 {
            1_000_000
        }
    }

    #[test]
    fn test_clock_lt_wraps() {
        assert!(clock_lt(1, 2));
        assert!(!clock_lt(2, 1));
        assert!(!clock_lt(5, 5));
        assert!(clock_lt(u32::MAX - 5, 3));
    }

    #[test]
    fn test_hold_waits_for_interval() {
        let clock = SteppingClock(Cell::new(0));
        hold(&clock, 100);
        assert!(clock.0.get() >= 100);
    }

    #[test]
    fn test_hold_across_wraparound() {
        let clock = SteppingClock(Cell::new(u32::MAX - 25));
        hold(&clock, 50);
        let now = clock.0.get();
        assert!(now >= 24 && now < 100);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        hold(&clock, 50);
        assert!(!clock_lt(clock.now(), a.wrapping_add(50)));
    }
}
