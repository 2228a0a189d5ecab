//! Release date normalization
//!
//! Albums store a calendar date with no time component. Clients send either a
//! plain date, a year-month, or a full timestamp; timestamps keep the calendar
//! date as written in their own offset so a date picked in one timezone is
//! never shifted by conversion to UTC.

use chrono::{DateTime, NaiveDate};

use crate::{Error, Result};

/// Parse a release date into a date-only value
///
/// Accepted forms:
/// - `2024-03-17`
/// - `2024-03` (first day of the month)
/// - `2024-03-01T12:00:00.000Z`, `2024-03-01T00:30:00+05:00` (RFC 3339)
pub fn parse_release_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("releaseDate is required".to_string()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Ok(timestamp.date_naive());
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d") {
        return Ok(date);
    }

    Err(Error::InvalidInput(format!(
        "releaseDate '{}' is not a valid date (expected YYYY-MM-DD, YYYY-MM or RFC 3339)",
        input
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plain_date() {
        assert_eq!(parse_release_date("2021-11-05").unwrap(), date(2021, 11, 5));
    }

    #[test]
    fn test_year_month() {
        assert_eq!(parse_release_date("1999-07").unwrap(), date(1999, 7, 1));
    }

    #[test]
    fn test_utc_noon_timestamp() {
        // Shape sent by the album form: first of the month at 12:00 UTC
        assert_eq!(
            parse_release_date("2024-03-01T12:00:00.000Z").unwrap(),
            date(2024, 3, 1)
        );
    }

    #[test]
    fn test_offset_timestamp_keeps_written_date() {
        // 00:30 at +05:00 is still Feb 29 in UTC; the written date wins
        assert_eq!(
            parse_release_date("2024-03-01T00:30:00+05:00").unwrap(),
            date(2024, 3, 1)
        );
    }

    #[test]
    fn test_rejects_garbage_and_empty() {
        assert!(matches!(parse_release_date("yesterday"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_release_date("  "), Err(Error::InvalidInput(_))));
        assert!(parse_release_date("2024-02-30").is_err());
    }
}
