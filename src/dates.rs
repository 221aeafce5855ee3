use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive ISO datetimes,
/// keeping only the calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

pub fn parse_query_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date(value).map(Some).ok_or_else(|| {
            AppError::validation(format!("Invalid {field}. Use ISO 8601 or YYYY-MM-DD"))
        }),
    }
}

/// `#[serde(deserialize_with = "crate::dates::lenient")]`
pub fn lenient<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| {
        serde::de::Error::custom("invalid date format, use ISO 8601 or YYYY-MM-DD")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn accepts_the_supported_shapes() {
        assert_eq!(parse_date("2025-03-14"), Some(d(2025, 3, 14)));
        assert_eq!(parse_date("2025-03-14T09:30:00Z"), Some(d(2025, 3, 14)));
        assert_eq!(parse_date("2025-03-14T09:30:00+09:00"), Some(d(2025, 3, 14)));
        assert_eq!(parse_date("2025-03-14T09:30:00.250"), Some(d(2025, 3, 14)));
        assert_eq!(parse_date("2025-03-14 09:30:00"), Some(d(2025, 3, 14)));
    }

    #[test]
    fn rejects_other_formats() {
        assert_eq!(parse_date("14/03/2025"), None);
        assert_eq!(parse_date("2025-02-30"), None);
    }

    #[test]
    fn blank_query_values_are_absent() {
        assert_eq!(parse_query_date("start_date", Some("  ")).unwrap(), None);
        assert_eq!(parse_query_date("start_date", None).unwrap(), None);
        assert!(parse_query_date("start_date", Some("yesterday")).is_err());
    }

    #[test]
    fn deserializes_through_serde() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(deserialize_with = "lenient")]
            day: NaiveDate,
        }
        let body: Body = serde_json::from_str(r#"{"day":"2025-01-02T00:00:00Z"}"#).unwrap();
        assert_eq!(body.day, d(2025, 1, 2));
    }
}
