use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, Month, OffsetDateTime};

use crate::ValidationError;

/// Wall-clock instant in UTC, serialized as RFC3339 with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Accepts RFC3339 input only when its offset is UTC.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        OffsetDateTime::parse(input.trim(), &Rfc3339)
            .ok()
            .filter(|value| value.offset().is_utc())
            .map(Self)
            .ok_or_else(|| ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            })
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| std::fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl TryFrom<String> for UtcDateTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UtcDateTime> for String {
    fn from(value: UtcDateTime) -> Self {
        value.to_string()
    }
}

/// Exchange-local calendar date of a daily bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingDate(Date);

impl TradingDate {
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        Month::try_from(month)
            .ok()
            .and_then(|month| Date::from_calendar_date(year, month, day).ok())
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidDate {
                value: format!("{year:04}-{month:02}-{day:02}"),
            })
    }

    /// Accepts `YYYY-MM-DD` and the compact `YYYYMMDD` form Naver emits.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };
        let trimmed = input.trim();
        if !trimmed.is_ascii() {
            return Err(invalid());
        }

        let (year, month, day) = match (trimmed.len(), trimmed.as_bytes()) {
            (10, bytes) if bytes[4] == b'-' && bytes[7] == b'-' => {
                (&trimmed[..4], &trimmed[5..7], &trimmed[8..])
            }
            (8, bytes) if bytes.iter().all(u8::is_ascii_digit) => {
                (&trimmed[..4], &trimmed[4..6], &trimmed[6..])
            }
            _ => return Err(invalid()),
        };

        match (year.parse(), month.parse(), day.parse()) {
            (Ok(year), Ok(month), Ok(day)) => Self::new(year, month, day).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    /// Date at the exchange for a unix timestamp, given the exchange's UTC
    /// offset in seconds.
    pub fn from_unix_with_offset(timestamp: i64, offset_secs: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp(timestamp.saturating_add(offset_secs))
            .map(|value| Self(value.date()))
            .map_err(|_| ValidationError::InvalidDate {
                value: timestamp.to_string(),
            })
    }

    pub fn today_utc() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    /// Saturates at the calendar's lower bound.
    pub fn days_before(self, days: i64) -> Self {
        self.0
            .checked_sub(Duration::days(days))
            .map_or(self, Self)
    }

    /// `YYYYMMDD`, as Naver's chart API expects.
    pub fn compact(self) -> String {
        format!(
            "{:04}{:02}{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl Display for TradingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl TryFrom<String> for TradingDate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TradingDate> for String {
    fn from(value: TradingDate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_timestamp_round_trips_through_json() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.to_string(), "2024-01-01T00:00:00Z");

        let json = serde_json::to_string(&parsed).expect("serialize");
        assert_eq!(json, r#""2024-01-01T00:00:00Z""#);
    }

    #[test]
    fn offset_timestamps_are_rejected() {
        let err = UtcDateTime::parse("2024-01-01T09:00:00+09:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
        assert!(serde_json::from_str::<UtcDateTime>(r#""2024-01-01T09:00:00+09:00""#).is_err());
    }

    #[test]
    fn both_date_forms_parse_to_the_same_day() {
        let dashed = TradingDate::parse("2024-03-05").expect("dashed");
        let compact = TradingDate::parse("20240305").expect("compact");
        assert_eq!(dashed, compact);
        assert_eq!(dashed.to_string(), "2024-03-05");
        assert_eq!(dashed.compact(), "20240305");
    }

    #[test]
    fn impossible_or_garbled_dates_are_rejected() {
        for input in ["2024-02-30", "2024/03/05", "2024-3-5", "２０２４0305", ""] {
            let err = TradingDate::parse(input).expect_err(input);
            assert!(matches!(err, ValidationError::InvalidDate { .. }));
        }
    }

    #[test]
    fn seoul_offset_moves_late_utc_into_next_session() {
        // 2024-01-01T15:00:00Z is already 2024-01-02 in Seoul.
        let date = TradingDate::from_unix_with_offset(1_704_121_200, 9 * 3600).expect("valid");
        assert_eq!(date.to_string(), "2024-01-02");
    }

    #[test]
    fn days_before_crosses_month_boundaries() {
        let date = TradingDate::parse("2024-03-01").expect("date");
        assert_eq!(date.days_before(1).to_string(), "2024-02-29");
    }
}
