//! Display formatting for contract values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{CustomFormat, ToFormattedString};

/// Rendered in place of any missing or empty value.
pub const NOT_AVAILABLE: &str = "Мавжуд эмас";

pub const CURRENCY_SUFFIX: &str = "сўм";

const DATE_FORMAT: &str = "%d.%m.%Y";

fn grouping() -> CustomFormat {
    CustomFormat::builder()
        .separator(" ")
        .minus_sign("-")
        .build()
        .unwrap_or_default()
}

/// Rounds to whole currency units. `None` for absent or zero amounts.
pub fn whole_units(amount: Option<f64>) -> Option<i64> {
    amount
        .filter(|a| a.is_finite())
        .map(|a| a.round() as i64)
        .filter(|a| *a != 0)
}

/// `1250000.0` -> `1 250 000 сўм`.
pub fn currency(amount: Option<f64>) -> String {
    match whole_units(amount) {
        Some(units) => format!("{} {}", units.to_formatted_string(&grouping()), CURRENCY_SUFFIX),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn percent(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite() && *v != 0.0) {
        Some(v) => format!("{}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Formats ISO dates, RFC 3339 timestamps and `YYYY-MM-DD HH:MM:SS` as
/// `DD.MM.YYYY`. Anything else is passed through untouched.
pub fn date(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(DATE_FORMAT).to_string();
    }
    for pattern in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format(DATE_FORMAT).to_string();
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return parsed.format(DATE_FORMAT).to_string();
    }
    raw.to_string()
}

pub fn text(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Integer codes; zero counts as missing.
pub fn code<T: ToString + PartialEq + Default>(value: Option<T>) -> String {
    value
        .filter(|v| *v != T::default())
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
