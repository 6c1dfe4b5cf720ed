//! Excel serial date conversion
//!
//! Dates are stored as serial numbers (days since a base date). In the 1900
//! date system serial 1 is 1900-01-01 and serial 60 is the fictional
//! 1900-02-29 kept for compatibility, so every date from March 1900 onwards
//! is one day "late" relative to a plain day count. The 1904 system counts
//! from 1904-01-01 = 0 and has no such quirk.

use chrono::{Datelike, NaiveDate};

/// Text layouts accepted when a string is coerced to a date
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y"];

/// Convert a calendar date to its serial number
pub fn date_to_serial(date: NaiveDate, date_1904: bool) -> f64 {
    if date_1904 {
        let base = NaiveDate::from_ymd_opt(1904, 1, 1).unwrap_or(NaiveDate::MIN);
        return (date - base).num_days() as f64;
    }

    let base = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap_or(NaiveDate::MIN);
    let days = (date - base).num_days();
    // Dates after the phantom leap day shift by one.
    if date.year() > 1900 || (date.year() == 1900 && date.month() > 2) {
        (days + 1) as f64
    } else {
        days as f64
    }
}

/// Parse date text such as `1/15/2024` or `2024-01-15`
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse date text straight to a serial number
pub fn parse_date_serial(text: &str, date_1904: bool) -> Option<f64> {
    parse_date_text(text).map(|d| date_to_serial(d, date_1904))
}
