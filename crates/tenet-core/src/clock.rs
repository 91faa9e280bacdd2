//! Time source for every time-dependent rule.
//!
//! Quiet hours, transition-window confidence, and audit look-back windows all
//! read the clock through the [`Clock`] trait so tests can pin the hour.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Timelike};
use parking_lot::Mutex;

/// First hour of the quiet window (inclusive).
pub const QUIET_HOURS_START: u32 = 22;

/// First hour after the quiet window.
pub const QUIET_HOURS_END: u32 = 8;

/// A source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Local hour of day, `0..24`.
    fn hour(&self) -> u32 {
        self.now().hour()
    }
}

/// Reads the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock at `hour:00` UTC on a fixed reference day.
    pub fn at_hour(hour: u32) -> Option<Self> {
        let naive = NaiveDate::from_ymd_opt(2026, 3, 2)?.and_hms_opt(hour, 0, 0)?;
        let offset = FixedOffset::east_opt(0)?;
        naive.and_local_timezone(offset).single().map(Self::new)
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock()
    }
}

/// True when `hour` falls in the 22:00–08:00 quiet window.
pub fn is_quiet_hour(hour: u32) -> bool {
    hour >= QUIET_HOURS_START || hour < QUIET_HOURS_END
}

/// True during the 07:00–09:00 and 17:00–19:00 transition windows, when
/// the human's availability is least predictable.
pub fn is_transition_hour(hour: u32) -> bool {
    (7..9).contains(&hour) || (17..19).contains(&hour)
}
