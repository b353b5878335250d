//! Wall-clock abstraction shared by every component that stamps rows.
//!
//! The hub reads time from exactly one [`Clock`] so identities, server rows
//! and events agree on ordering. Tests inject a [`ManualClock`] or a closure.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Source of the current time in Unix milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    /// Current time in whole Unix seconds
    fn now_secs(&self) -> i64 {
        self.now_millis().div_euclid(1000)
    }
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl<F> Clock for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now_millis(&self) -> i64 {
        self()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn from_secs(secs: i64) -> Self {
        Self::new(secs * 1000)
    }

    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn set_secs(&self, secs: i64) {
        self.set_millis(secs * 1000);
    }

    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::from_secs(1_700_000_000);
        assert_eq!(clock.now_secs(), 1_700_000_000);

        clock.advance_millis(1_500);
        assert_eq!(clock.now_millis(), 1_700_000_001_500);
        assert_eq!(clock.now_secs(), 1_700_000_001);
    }

    #[test]
    fn test_closure_is_a_clock() {
        let clock = || 42_999_i64;
        assert_eq!(clock.now_millis(), 42_999);
        assert_eq!(clock.now_secs(), 42);
    }

    #[test]
    fn test_system_clock_is_after_2024() {
        assert!(SystemClock.now_secs() > 1_704_067_200);
    }
}
