//! Trading dates and news timestamps in the provider's textual forms.
//!
//! | Type | Canonical | Also accepted |
//! |------|-----------|---------------|
//! | [`TradingDate`] | `YYYY-MM-DD` | `YYYYMMDD` |
//! | [`NewsTimestamp`] | `YYYYMMDDTHHMMSS` | `YYYYMMDDTHHMM`, `YYYYMMDD` |
//!
//! Canonical forms are fixed width, so comparing them as strings (which is
//! what the document store does) orders them chronologically.

use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::ValidationError;

/// Calendar day of a daily price record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(Date);

impl TradingDate {
    /// Parse either `YYYY-MM-DD` or `YYYYMMDD`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };

        let compact = match trimmed.len() {
            8 => trimmed.to_owned(),
            10 if trimmed.as_bytes()[4] == b'-' && trimmed.as_bytes()[7] == b'-' => {
                format!("{}{}{}", &trimmed[..4], &trimmed[5..7], &trimmed[8..])
            }
            _ => return Err(invalid()),
        };

        parse_compact_date(&compact).map(Self).ok_or_else(invalid)
    }

    pub fn canonical(self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }
}

impl Display for TradingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for TradingDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for TradingDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Publication instant of a news article, minute or second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NewsTimestamp(PrimitiveDateTime);

impl NewsTimestamp {
    /// Parse `YYYYMMDDTHHMMSS`, `YYYYMMDDTHHMM`, or a bare `YYYYMMDD` (midnight).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Self::parse_with_day_default(input, Time::MIDNIGHT)
    }

    /// Like [`NewsTimestamp::parse`] but a bare date resolves to `23:59:59`.
    pub fn parse_end_of_day(input: &str) -> Result<Self, ValidationError> {
        let end_of_day = Time::from_hms(23, 59, 59).unwrap_or(Time::MIDNIGHT);
        Self::parse_with_day_default(input, end_of_day)
    }

    fn parse_with_day_default(input: &str, day_default: Time) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidTimestamp {
            value: input.to_owned(),
        };

        let (day, clock) = match trimmed.split_once('T') {
            Some((day, clock)) => (day, Some(clock)),
            None => (trimmed, None),
        };
        let date = parse_compact_date(day).ok_or_else(invalid)?;

        let time = match clock {
            None => day_default,
            Some(clock) if matches!(clock.len(), 4 | 6) => {
                let hour = digits(clock, 0, 2).ok_or_else(invalid)?;
                let minute = digits(clock, 2, 4).ok_or_else(invalid)?;
                let second = if clock.len() == 6 {
                    digits(clock, 4, 6).ok_or_else(invalid)?
                } else {
                    0
                };
                Time::from_hms(hour as u8, minute as u8, second as u8).map_err(|_| invalid())?
            }
            Some(_) => return Err(invalid()),
        };

        Ok(Self(PrimitiveDateTime::new(date, time)))
    }

    /// `YYYYMMDDTHHMMSS`.
    pub fn canonical(self) -> String {
        format!("{}{:02}", self.query_form(), self.0.second())
    }

    /// `YYYYMMDDTHHMM`, the precision the news endpoint accepts.
    pub fn query_form(self) -> String {
        format!(
            "{:04}{:02}{:02}T{:02}{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day(),
            self.0.hour(),
            self.0.minute()
        )
    }
}

impl Display for NewsTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for NewsTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for NewsTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Inclusive publication-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsWindow {
    from: NewsTimestamp,
    to: NewsTimestamp,
}

impl NewsWindow {
    pub fn new(from: NewsTimestamp, to: NewsTimestamp) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvertedWindow {
                from: from.canonical(),
                to: to.canonical(),
            });
        }
        Ok(Self { from, to })
    }

    /// Parse user-facing bounds; a bare date as `to` covers that whole day.
    pub fn parse(from: &str, to: &str) -> Result<Self, ValidationError> {
        Self::new(
            NewsTimestamp::parse(from)?,
            NewsTimestamp::parse_end_of_day(to)?,
        )
    }

    pub const fn from(&self) -> NewsTimestamp {
        self.from
    }

    pub const fn to(&self) -> NewsTimestamp {
        self.to
    }
}

fn parse_compact_date(input: &str) -> Option<Date> {
    if input.len() != 8 {
        return None;
    }
    let year = digits(input, 0, 4)?;
    let month = Month::try_from(digits(input, 4, 6)? as u8).ok()?;
    let day = digits(input, 6, 8)?;
    Date::from_calendar_date(year as i32, month, day as u8).ok()
}

fn digits(input: &str, start: usize, end: usize) -> Option<u32> {
    let slice = input.get(start..end)?;
    if !slice.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    slice.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_and_canonical_dates_round_trip() {
        let date = TradingDate::parse("20251223").expect("valid");
        assert_eq!(date.canonical(), "2025-12-23");
        assert_eq!(TradingDate::parse(&date.canonical()).expect("valid"), date);
    }

    #[test]
    fn rejects_malformed_dates() {
        for input in ["2025122", "202512233", "2025-1223", "2025122a", "20251301", "20250230", ""] {
            assert!(
                TradingDate::parse(input).is_err(),
                "'{input}' should be rejected"
            );
        }
    }

    #[test]
    fn news_timestamps_accept_minute_and_second_precision() {
        let minute = NewsTimestamp::parse("20251223T1430").expect("valid");
        let second = NewsTimestamp::parse("20251223T143000").expect("valid");
        assert_eq!(minute, second);
        assert_eq!(minute.canonical(), "20251223T143000");
        assert_eq!(minute.query_form(), "20251223T1430");
    }

    #[test]
    fn rejects_malformed_news_timestamps() {
        for input in ["20251223T14", "20251223T2560", "20251223 1430", "x0251223T1430"] {
            assert!(
                NewsTimestamp::parse(input).is_err(),
                "'{input}' should be rejected"
            );
        }
    }

    #[test]
    fn date_only_window_covers_whole_days() {
        let window = NewsWindow::parse("20251201", "20251223").expect("valid");
        assert_eq!(window.from().canonical(), "20251201T000000");
        assert_eq!(window.to().canonical(), "20251223T235959");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let error = NewsWindow::parse("20251224", "20251223").expect_err("inverted");
        assert!(matches!(error, ValidationError::InvertedWindow { .. }));
    }

    #[test]
    fn trading_date_serializes_canonically() {
        let date = TradingDate::parse("20250102").expect("valid");
        assert_eq!(serde_json::to_string(&date).expect("json"), "\"2025-01-02\"");
    }
}
