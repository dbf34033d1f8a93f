//! Wall-clock access.

use chrono::{Local, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use std::time::Duration;

/// Source of the current time and local date.
pub trait Clock: Send + Sync {
    /// Current time in Unix milliseconds.
    fn now_ms(&self) -> i64;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate;
}

/// The system clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Local::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A settable clock for tests.
///
/// The configured local time is also interpreted as UTC for `now_ms`, so
/// dates and timestamps stay consistent regardless of the host time zone.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        let mut now = self.now.lock();
        *now += chrono::Duration::milliseconds(millis);
    }

    /// Returns the current local time.
    pub fn local_now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.lock().and_utc().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        self.now.lock().date()
    }
}
