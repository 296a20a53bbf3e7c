//! Injectable wall clock.
//!
//! Normalization defaults (`id`, `timestamp`) and humanized times are
//! derived from "now". Callers pass a [`Clock`] so tests can pin it.

use std::fmt::Debug;

use chrono::{DateTime, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + Debug {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Freeze the clock at `at`.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Freeze the clock at an epoch-millisecond instant.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    #[must_use]
    pub fn at_millis(millis: i64) -> Self {
        Self(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock::at_millis(1_700_000_000_000);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now_millis(), 1_700_000_000_000);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.now() > a);
    }

    #[test]
    fn out_of_range_millis_fall_back_to_epoch() {
        let clock = FixedClock::at_millis(i64::MAX);
        assert_eq!(clock.now_millis(), 0);
    }
}
