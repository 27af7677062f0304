//! UTC instants as the store keeps them.
//!
//! Sqlite has no timestamp type, so timestamps are stored as text in one fixed-width format.  Because every stored
//! value has the same width and the same offset, ordering by the text column is the same as ordering by time, which is
//! what lets `ORDER BY birthday` find the oldest row.  That only holds while the year has exactly four digits and no
//! sign, so years outside 0000 to 9999 are refused.
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::{Error, Result};

/// The stored form, e.g. `1879-03-14T00:00:00.000000Z`.
const STORAGE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

/// The form used for display.
const DISPLAY_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// A UTC instant with microsecond precision.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Timestamp(OffsetDateTime);

/// Years the stored form can order correctly.
pub const MIN_YEAR: i32 = 0;
pub const MAX_YEAR: i32 = 9999;

fn range_error(e: time::error::ComponentRange) -> Error {
    Error::Timestamp(e.to_string())
}

fn check_year(value: OffsetDateTime) -> Result<OffsetDateTime> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&value.year()) {
        return Err(Error::Timestamp(format!(
            "year {} is outside {:04} to {:04}",
            value.year(),
            MIN_YEAR,
            MAX_YEAR
        )));
    }
    Ok(value)
}

/// Drop anything finer than a microsecond, since the store can't hold it.
fn truncate_to_micros(utc: OffsetDateTime) -> OffsetDateTime {
    let extra_nanos = (utc.nanosecond() % 1000) as i64;
    utc - Duration::nanoseconds(extra_nanos)
}

impl Timestamp {
    pub fn now() -> Timestamp {
        Timestamp(truncate_to_micros(OffsetDateTime::now_utc()))
    }

    /// Normalize to UTC at microsecond precision.
    pub fn from_offset_date_time(value: OffsetDateTime) -> Result<Timestamp> {
        let utc = check_year(value.to_offset(UtcOffset::UTC))?;
        Ok(Timestamp(truncate_to_micros(utc)))
    }

    /// Midnight UTC on the given day.
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Timestamp> {
        Timestamp::from_ymd_hms(year, month, day, 0, 0, 0)
    }

    pub fn from_ymd_hms(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Timestamp> {
        let month = Month::try_from(month).map_err(range_error)?;
        let date = Date::from_calendar_date(year, month, day).map_err(range_error)?;
        let time = Time::from_hms(hour, minute, second).map_err(range_error)?;
        let value = check_year(PrimitiveDateTime::new(date, time).assume_utc())?;
        Ok(Timestamp(value))
    }

    pub fn as_offset_date_time(&self) -> OffsetDateTime {
        self.0
    }

    /// Parse the stored form.
    pub fn parse(text: &str) -> Result<Timestamp> {
        let parsed = PrimitiveDateTime::parse(text, STORAGE_FORMAT)
            .map_err(|e| Error::Timestamp(format!("{}: {}", text, e)))?;
        Ok(Timestamp(check_year(parsed.assume_utc())?))
    }

    /// Render the stored form.
    pub fn to_storage_text(&self) -> Result<String> {
        self.0
            .format(STORAGE_FORMAT)
            .map_err(|e| Error::Timestamp(e.to_string()))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = self.0.format(DISPLAY_FORMAT).map_err(|_| std::fmt::Error)?;
        f.write_str(&text)
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_storage_text().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_storage_text() {
        let ts = Timestamp::from_ymd(1879, 3, 14).unwrap();
        assert_eq!(ts.to_storage_text().unwrap(), "1879-03-14T00:00:00.000000Z");
        assert_eq!(Timestamp::parse("1879-03-14T00:00:00.000000Z").unwrap(), ts);
        assert_eq!(ts.to_string(), "1879-03-14 00:00:00");
    }

    /// Text order has to agree with time order, or sorting in the store breaks.
    #[test]
    fn test_text_order_is_time_order() {
        let times = [
            Timestamp::from_ymd(1879, 3, 14).unwrap(),
            Timestamp::from_ymd_hms(1912, 6, 23, 0, 0, 0).unwrap(),
            Timestamp::from_ymd_hms(1912, 6, 23, 0, 0, 1).unwrap(),
            Timestamp::now(),
        ];

        for pair in times.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_storage_text().unwrap() < pair[1].to_storage_text().unwrap());
        }
    }

    #[test]
    fn test_years_outside_four_digits_are_refused() {
        assert!(Timestamp::from_ymd(-50, 1, 1).is_err());
        assert!(Timestamp::from_ymd(-100, 1, 1).is_err());
        assert!(Timestamp::from_ymd(10000, 1, 1).is_err());
        assert!(Timestamp::parse("-0100-01-01T00:00:00.000000Z").is_err());

        let early = Date::from_calendar_date(-50, Month::January, 1)
            .unwrap()
            .midnight()
            .assume_utc();
        assert!(Timestamp::from_offset_date_time(early).is_err());
        // Refused after moving to UTC, not before.
        let crosses = Date::from_calendar_date(0, Month::January, 1)
            .unwrap()
            .midnight()
            .assume_offset(UtcOffset::from_hms(2, 0, 0).unwrap());
        assert!(Timestamp::from_offset_date_time(crosses).is_err());

        let first = Timestamp::from_ymd(MIN_YEAR, 1, 1).unwrap();
        let last = Timestamp::from_ymd_hms(MAX_YEAR, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(first.to_storage_text().unwrap(), "0000-01-01T00:00:00.000000Z");
        assert!(first.to_storage_text().unwrap() < last.to_storage_text().unwrap());
    }

    #[test]
    fn test_from_offset_date_time() {
        let value = PrimitiveDateTime::new(
            Date::from_calendar_date(1912, Month::June, 23).unwrap(),
            Time::from_hms_nano(2, 0, 0, 123_456_789).unwrap(),
        )
        .assume_offset(UtcOffset::from_hms(2, 0, 0).unwrap());
        let ts = Timestamp::from_offset_date_time(value).unwrap();
        assert_eq!(ts.to_storage_text().unwrap(), "1912-06-23T00:00:00.123456Z");
    }

    #[test]
    fn test_now_survives_storage() {
        let now = Timestamp::now();
        let text = now.to_storage_text().unwrap();
        assert_eq!(Timestamp::parse(&text).unwrap(), now);
    }

    #[test]
    fn test_invalid_components() {
        assert!(Timestamp::from_ymd(1912, 13, 1).is_err());
        assert!(Timestamp::from_ymd(1912, 2, 30).is_err());
        assert!(Timestamp::parse("1912-06-23").is_err());
    }
}
