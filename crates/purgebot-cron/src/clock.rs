//! Time sources for scheduling decisions.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Supplies the current instant in the bot's configured offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock shifted to a fixed UTC offset, independent of the host's local zone.
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock {
    offset: FixedOffset,
}

impl OffsetClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A clock that only moves when told to. Used by tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_offset_clock_uses_configured_offset() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let clock = OffsetClock::new(offset);
        let now = clock.now();
        assert_eq!(now.offset().local_minus_utc(), 5 * 3600 + 1800);
        assert!((now.with_timezone(&Utc) - Utc::now()).num_seconds().abs() < 5);
    }

    #[test]
    fn test_manual_clock_advance() {
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 10, 0, 0)
            .unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(10));
        assert_eq!(clock.now(), start + Duration::seconds(10));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
