use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use dor_types::Timestamp;

/// Source of the current date for new versions, audit records, and
/// modification stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time, truncated to whole seconds to match the wire format.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = Utc::now();
        DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self {
            seconds: AtomicI64::new(at.timestamp()),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.seconds.store(at.timestamp(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_advances_on_request() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(90);
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 30).unwrap());
        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn system_clock_has_no_subseconds() {
        assert_eq!(SystemClock.now().timestamp_subsec_nanos(), 0);
    }
}
