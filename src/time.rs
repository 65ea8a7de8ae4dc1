use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Whole seconds on the scheduling timeline.
#[derive(Debug, Clone, Copy, Default, Ord, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd)]
pub struct Time(pub u64);

impl Time {
    pub fn minutes(m: u64) -> Time {
        Time(m.saturating_mul(60))
    }

    /// `self + secs`, or `None` past the end of the timeline.
    pub fn checked_add(self, secs: u64) -> Option<Time> {
        self.0.checked_add(secs).map(Time)
    }

    /// Absolute distance between two instants.
    pub fn abs_diff(self, other: Time) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Whole minutes from `self` until `later`, zero if `later` is not ahead.
    pub fn minutes_until(self, later: Time) -> u64 {
        later.0.saturating_sub(self.0) / 60
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let days = self.0 / 86_400;
        let remaining = self.0 % 86_400;
        let hours = remaining / 3600;
        let mins = (remaining % 3600) / 60;
        let secs = remaining % 60;
        write!(f, "DAY{} {:02}:{:02}:{:02}", days + 1, hours, mins, secs)
    }
}

impl Add<u64> for Time {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Time(self.0.saturating_add(rhs))
    }
}

impl Add<Time> for Time {
    type Output = Self;

    fn add(self, rhs: Time) -> Self::Output {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl Sub<u64> for Time {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Time(self.0.saturating_sub(rhs))
    }
}

impl Sub<Time> for Time {
    type Output = Self;

    fn sub(self, rhs: Time) -> Self::Output {
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign<u64> for Time {
    fn add_assign(&mut self, rhs: u64) {
        self.0 = self.0.saturating_add(rhs);
    }
}

/// Source of "now" for everything that is not handed an explicit instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Time;
}

/// Wall clock, seconds since the UNIX epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Time(d.as_secs()))
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to. Used for scenario replay and tests.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start: Time) -> Self {
        ManualClock(AtomicU64::new(start.0))
    }

    pub fn set(&self, time: Time) {
        self.0.store(time.0, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(secs)));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        Time(self.0.load(Ordering::SeqCst))
    }
}
