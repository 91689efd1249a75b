//! Event time construction.
//!
//! Bookings are made from plain calendar dates. The time of day and the
//! timezone come from [`EventDefaults`]: 12:01 for the start, 12:00 for the
//! end, both in `GMT` unless configured otherwise.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date formats accepted for booking dates, tried in order, with the byte
/// offsets of their two separators. Both are exactly ten characters long.
const DATE_FORMATS: [(&str, [usize; 2]); 2] = [("%Y-%m-%d", [4, 7]), ("%d-%m-%Y", [2, 5])];

/// Errors produced while turning booking dates into event timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The date string matched none of the accepted formats.
    #[error("invalid date '{0}', expected YYYY-MM-DD or DD-MM-YYYY")]
    InvalidDate(String),

    /// The configured timezone is not a known IANA name.
    #[error("unknown timezone '{0}'")]
    UnknownTimeZone(String),

    /// The local time does not exist in the timezone (DST gap).
    #[error("{date} {time} does not exist in timezone {time_zone}")]
    NonexistentLocalTime {
        date: NaiveDate,
        time: NaiveTime,
        time_zone: String,
    },
}

/// Defaults applied to every created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDefaults {
    /// Time of day an event starts on its start date.
    pub start_time: NaiveTime,
    /// Time of day an event ends on its end date.
    pub end_time: NaiveTime,
    /// Timezone label sent with each timestamp and used to compute its offset.
    pub time_zone: String,
    /// Event status for new events.
    pub status: String,
    /// Calendar color id for new events.
    pub color_id: String,
}

impl Default for EventDefaults {
    fn default() -> Self {
        Self {
            start_time: NaiveTime::from_hms_opt(12, 1, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
            time_zone: "GMT".to_string(),
            status: "tentative".to_string(),
            color_id: "4".to_string(),
        }
    }
}

impl EventDefaults {
    /// Sets the start time of day.
    #[must_use]
    pub fn with_start_time(mut self, time: NaiveTime) -> Self {
        self.start_time = time;
        self
    }

    /// Sets the end time of day.
    #[must_use]
    pub fn with_end_time(mut self, time: NaiveTime) -> Self {
        self.end_time = time;
        self
    }

    /// Sets the timezone.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Parses the configured timezone.
    pub fn tz(&self) -> Result<Tz, TimeError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| TimeError::UnknownTimeZone(self.time_zone.clone()))
    }

    /// Returns the start timestamp for a booking starting on `date`.
    pub fn start_on(&self, date: NaiveDate) -> Result<DateTime<FixedOffset>, TimeError> {
        self.at(date, self.start_time)
    }

    /// Returns the end timestamp for a booking ending on `date`.
    pub fn end_on(&self, date: NaiveDate) -> Result<DateTime<FixedOffset>, TimeError> {
        self.at(date, self.end_time)
    }

    fn at(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<FixedOffset>, TimeError> {
        let tz = self.tz()?;
        // Ambiguous local times (DST fold) resolve to the earlier instant.
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| TimeError::NonexistentLocalTime {
                date,
                time,
                time_zone: self.time_zone.clone(),
            })
    }
}

/// Parses a booking date in `YYYY-MM-DD` or `DD-MM-YYYY` form.
///
/// Years must have four digits and days and months two; chrono alone would
/// read `10-01-24` as the year 10.
pub fn parse_event_date(input: &str) -> Result<NaiveDate, TimeError> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .filter(|(_, separators)| has_shape(trimmed, separators))
        .find_map(|(fmt, _)| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimeError::InvalidDate(input.to_string()))
}

fn has_shape(input: &str, separators: &[usize; 2]) -> bool {
    input.len() == 10
        && input.bytes().enumerate().all(|(i, b)| {
            if separators.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_digit()
            }
        })
}

/// Formats a timestamp the way the Calendar API expects (`2024-01-10T12:01:00+00:00`).
pub fn format_event_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_event_date("2024-01-10").unwrap(), date(2024, 1, 10));
        assert_eq!(parse_event_date(" 2024-01-10 ").unwrap(), date(2024, 1, 10));
    }

    #[test]
    fn parses_day_first_dates() {
        assert_eq!(parse_event_date("10-01-2024").unwrap(), date(2024, 1, 10));
    }

    #[test]
    fn rejects_garbage_dates() {
        let err = parse_event_date("next tuesday").unwrap_err();
        assert_eq!(err, TimeError::InvalidDate("next tuesday".to_string()));
        assert!(parse_event_date("2024-02-30").is_err());
        assert!(parse_event_date("").is_err());
    }

    #[test]
    fn rejects_short_fields() {
        assert!(parse_event_date("10-01-24").is_err());
        assert!(parse_event_date("1-2-3").is_err());
        assert!(parse_event_date("2024-1-10").is_err());
        assert!(parse_event_date("24-01-10").is_err());
        assert!(parse_event_date("+2024-01-1").is_err());
        assert!(parse_event_date("2024/01/10").is_err());
    }

    #[test]
    fn default_booking_times() {
        let defaults = EventDefaults::default();
        let start = defaults.start_on(date(2024, 1, 10)).unwrap();
        let end = defaults.end_on(date(2024, 1, 11)).unwrap();

        assert_eq!(format_event_datetime(&start), "2024-01-10T12:01:00+00:00");
        assert_eq!(format_event_datetime(&end), "2024-01-11T12:00:00+00:00");
        assert_eq!(defaults.time_zone, "GMT");
        assert_eq!(defaults.status, "tentative");
        assert_eq!(defaults.color_id, "4");
    }

    #[test]
    fn named_timezone_offsets() {
        let defaults = EventDefaults::default().with_time_zone("Europe/Paris");

        let winter = defaults.start_on(date(2024, 1, 10)).unwrap();
        assert_eq!(format_event_datetime(&winter), "2024-01-10T12:01:00+01:00");

        let summer = defaults.start_on(date(2024, 7, 10)).unwrap();
        assert_eq!(format_event_datetime(&summer), "2024-07-10T12:01:00+02:00");
    }

    #[test]
    fn custom_times_of_day() {
        let defaults = EventDefaults::default()
            .with_start_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap())
            .with_end_time(NaiveTime::from_hms_opt(17, 0, 0).unwrap());

        let start = defaults.start_on(date(2024, 3, 1)).unwrap();
        let end = defaults.end_on(date(2024, 3, 1)).unwrap();
        assert_eq!(format_event_datetime(&start), "2024-03-01T09:30:00+00:00");
        assert_eq!(format_event_datetime(&end), "2024-03-01T17:00:00+00:00");
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let defaults = EventDefaults::default().with_time_zone("Mars/Olympus");
        assert_eq!(
            defaults.start_on(date(2024, 1, 10)).unwrap_err(),
            TimeError::UnknownTimeZone("Mars/Olympus".to_string())
        );
    }

    #[test]
    fn dst_gap_is_an_error() {
        let defaults = EventDefaults::default()
            .with_time_zone("Europe/London")
            .with_start_time(NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        let err = defaults.start_on(date(2024, 3, 31)).unwrap_err();
        assert!(matches!(err, TimeError::NonexistentLocalTime { .. }));
    }

    #[test]
    fn defaults_deserialize_partially() {
        let json = r#"{ "time_zone": "America/New_York" }"#;
        let defaults: EventDefaults = serde_json::from_str(json).unwrap();
        assert_eq!(defaults.time_zone, "America/New_York");
        assert_eq!(defaults.start_time, NaiveTime::from_hms_opt(12, 1, 0).unwrap());
        assert_eq!(defaults.color_id, "4");
    }
}
