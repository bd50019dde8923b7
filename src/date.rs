use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use std::sync::LazyLock;

use crate::error::{Error, Result};

static SLASHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})/([012]?\d)/([0123]?\d)$").expect("date pattern is valid")
});

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Parses a date given as `yyyy-mm-dd` or `yyyy/M/d`.
///
/// # Errors
///
/// Returns a format error for any other text, or for a date that doesn't
/// exist (such as `2022/2/30`).
///
/// # Examples
///
/// ```
/// # use invoices::date::parse_date;
/// # use chrono::NaiveDate;
/// let expected = NaiveDate::from_ymd_opt(2022, 1, 6).unwrap();
/// assert_eq!(parse_date("2022-01-06").unwrap(), expected);
/// assert_eq!(parse_date("2022/1/6").unwrap(), expected);
/// assert!(parse_date("6 Jan 2022").is_err());
/// ```
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    SLASHED
        .captures(text)
        .and_then(|c| {
            NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)
        })
        .ok_or_else(|| Error::Format(text.to_string()))
}

/// Parses the date cell of an order row.
///
/// Spreadsheet exports often write dates with a time of day, so this accepts
/// datetimes as well as the forms [`parse_date`] does, and drops the time.
///
/// # Errors
///
/// Returns a validation error if the text is not a date or datetime.
pub fn parse_row_date(text: &str) -> Result<NaiveDate> {
    parse_date(text).or_else(|_| {
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
            .map(|dt| dt.date())
            .ok_or_else(|| Error::validation(format!("{text:?} is not a date")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_date_fn_accepts_iso_and_slashed_dates() {
        assert_eq!(parse_date("2022-01-06").unwrap(), ymd(2022, 1, 6));
        assert_eq!(parse_date("2022/01/06").unwrap(), ymd(2022, 1, 6));
        assert_eq!(parse_date("2022/12/31").unwrap(), ymd(2022, 12, 31));
    }

    #[test]
    fn parse_date_fn_returns_format_error_for_bad_input() {
        assert!(matches!(parse_date("2022/13/01"), Err(Error::Format(_))));
        assert!(matches!(parse_date("2022/2/30"), Err(Error::Format(_))));
        assert!(matches!(parse_date("22/1/6"), Err(Error::Format(_))));
        assert!(matches!(parse_date(""), Err(Error::Format(_))));
    }

    #[test]
    fn parse_row_date_fn_drops_time_of_day() {
        assert_eq!(parse_row_date("2022-01-06 00:00:00").unwrap(), ymd(2022, 1, 6));
        assert_eq!(parse_row_date("2022-01-06T15:30:00").unwrap(), ymd(2022, 1, 6));
        assert_eq!(parse_row_date("2022/1/6 9:05").unwrap(), ymd(2022, 1, 6));
        assert!(matches!(parse_row_date("昨日"), Err(Error::Validation { .. })));
    }
}
