//! # Clock Collaborator
//!
//! Injectable time source. Nothing in the engine or the rate calculation
//! calls `Utc::now()` directly; "now" always flows in through this trait
//! so every time-dependent behavior is testable with a fixed instant.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

// =============================================================================
// Clock Trait
// =============================================================================

/// A source of "now".
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// System Clock
// =============================================================================

/// The real wall clock. Production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// Manual Clock
// =============================================================================

/// A settable clock for tests: time only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    /// Jumps the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().expect("clock poisoned") = to;
    }

    /// Advances the clock by `minutes`.
    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.lock().expect("clock poisoned");
        *now += chrono::Duration::minutes(minutes);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock poisoned")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_is_frozen_until_moved() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let clock = ManualClock::new(t0);

        assert_eq!(clock.now(), t0);
        assert_eq!(clock.now(), t0);

        clock.advance_minutes(90);
        assert_eq!(clock.now(), t0 + chrono::Duration::minutes(90));

        clock.set(t0);
        assert_eq!(clock.now(), t0);
    }
}
