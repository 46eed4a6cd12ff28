//! Price cleanup and `DD/MM/YYYY` calendar arithmetic.

use chrono::{Datelike, Days, NaiveDate};

use crate::ValidationError;

/// Display format used by the booking site and by crawl summaries.
pub const DAY_FORMAT: &str = "%d/%m/%Y";

/// Strip everything but ASCII digits from a displayed amount.
///
/// The booking site renders amounts with locale grouping (`1,290,000 VND`,
/// `1.290.000 ₫`) and never shows fractional currency, so digits alone carry
/// the value. Normalizing an already normalized string is a no-op.
pub fn normalize_price(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// A normalized price is usable when it is non-empty and not all zeros.
pub fn is_priced(normalized: &str) -> bool {
    !normalized.is_empty()
        && normalized.chars().all(|c| c.is_ascii_digit())
        && normalized.chars().any(|c| c != '0')
}

/// Parse a `DD/MM/YYYY` string.
pub fn parse_day(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Format a date as `DD/MM/YYYY`.
pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// ISO `YYYY-MM-DD` rendering used in [`crate::PriceRecord::flight_date`].
pub fn iso_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Advance a `DD/MM/YYYY` string by one calendar day.
pub fn next_day(raw: &str) -> Result<String, ValidationError> {
    let date = parse_day(raw)?;
    date.checked_add_days(Days::new(1))
        .map(format_day)
        .ok_or_else(|| ValidationError::InvalidDate(raw.to_string()))
}

/// Last calendar day of the month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}
