use std::sync::Mutex;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Source of "now" for every past-slot and lead-time decision.
///
/// Returned times are naive and in the business's local time, the same frame
/// as booking dates and slot times.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock shifted to a fixed UTC offset.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(utc_offset_minutes: i32) -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .ok_or_else(|| anyhow::anyhow!("UTC offset out of range: {utc_offset_minutes} minutes"))?;
        Ok(Self { offset })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn at(s: &str) -> anyhow::Result<Self> {
        let now = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")?;
        Ok(Self::new(now))
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_moves_on_demand() {
        let clock = FixedClock::at("2025-06-01 08:00").unwrap();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        clock.advance(Duration::hours(17));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
    }

    #[test]
    fn test_system_clock_offset_bounds() {
        assert!(SystemClock::new(330).is_ok());
        assert!(SystemClock::new(24 * 60).is_err());
    }
}
