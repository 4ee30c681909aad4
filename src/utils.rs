use crate::schema::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Day 25569 of the spreadsheet calendar (counted from 1899-12-30) is 1970-01-01.
pub const SPREADSHEET_UNIX_EPOCH_SERIAL: f64 = 25569.0;

const SECONDS_PER_DAY: f64 = 86400.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%Y%m%d"];

/// Resolves a date cell to a calendar date.
///
/// Native dates pass through, numbers are spreadsheet serial days and text is
/// parsed against the common export formats. Blank or unparsable cells yield
/// `None`; choosing a substitute is left to the caller.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    if value.is_blank() {
        return None;
    }

    match value {
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Number(serial) => date_from_serial(*serial),
        CellValue::Text(text) => parse_date_str(text),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Converts a spreadsheet serial day number (fractions are time of day) to a
/// UTC calendar date.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let millis = ((serial - SPREADSHEET_UNIX_EPOCH_SERIAL) * SECONDS_PER_DAY * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.date_naive())
}

pub fn parse_date_str(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    None
}

/// Short month plus two-digit year, e.g. `Jan 24`.
pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %y").to_string()
}

/// Rounds to a whole number and inserts thousands separators.
pub fn format_number(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// New Taiwan dollar amount with no decimals, e.g. `$1,234` or `-$1,234`.
pub fn format_currency(value: f64) -> String {
    let number = format_number(value);
    match number.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", number),
    }
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value)
}
