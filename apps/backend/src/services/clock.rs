//! Current instant and study-day key.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use study_core::dates::day_key;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Study day an instant belongs to.
    fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        day_key(instant, 0)
    }

    fn today_key(&self) -> NaiveDate {
        self.day_of(self.now())
    }
}

/// Wall clock. Days roll over at `rollover_hour` UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pub rollover_hour: u32,
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        day_key(instant, self.rollover_hour)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances_across_days() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap());
        assert_eq!(clock.today_key(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        clock.advance(Duration::hours(2));
        assert_eq!(clock.today_key(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_system_clock_rollover() {
        let clock = SystemClock { rollover_hour: 4 };
        let late = Utc.with_ymd_and_hms(2024, 6, 2, 2, 0, 0).unwrap();
        assert_eq!(clock.day_of(late), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }
}
