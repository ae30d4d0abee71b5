//! Day keys for bucketing daily counters.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use crate::error::{Result, ValidationError};

/// Get the study day an instant belongs to.
///
/// Days are UTC calendar dates. With a non-zero `rollover_hour`, instants
/// before that hour still count towards the previous day, so a late-night
/// session lands on the day it started.
pub fn day_key(now: DateTime<Utc>, rollover_hour: u32) -> NaiveDate {
    if now.hour() < rollover_hour {
        (now - Duration::days(1)).date_naive()
    } else {
        now.date_naive()
    }
}

/// Parse a `YYYY-MM-DD` day key supplied by a caller.
pub fn parse_day_key(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::MalformedDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_midnight_rollover_is_utc_date() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 0, 30, 0).unwrap();
        assert_eq!(day_key(now, 0), NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
    }

    #[test]
    fn test_before_rollover_counts_as_previous_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 3, 0, 0).unwrap();
        assert_eq!(day_key(now, 4), NaiveDate::from_ymd_opt(2024, 5, 9).unwrap());
        assert_eq!(day_key(now, 3), NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
    }

    #[test]
    fn test_parse_day_key() {
        let day = parse_day_key(" 2024-02-29 ").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_day_key("2024-02-30"),
            Err(ValidationError::MalformedDate(_))
        ));
        assert!(parse_day_key("yesterday").is_err());
    }
}
