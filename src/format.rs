//! Currency and date presentation helpers.
//!
//! Dates are stored as ISO `YYYY-MM-DD` and presented as `MM/DD/YYYY`; currency is
//! presented with a dollar sign and thousands separators. The parse helpers are lenient
//! because they face user input; the rest of the crate stores only the normalized forms.

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

const ISO_DATE: &str = "%Y-%m-%d";
const US_DATE: &str = "%m/%d/%Y";

/// Formats an amount as `$1,234.56` (or `-$1,234.56`).
pub fn format_currency(amount: Decimal) -> String {
    let (sign, magnitude) = if amount.is_sign_negative() {
        ("-", amount.abs())
    } else {
        ("", amount)
    };
    format!(
        "{sign}${}",
        format_num::format_num!(",.2", magnitude.to_f64().unwrap_or_default())
    )
}

/// Presents a stored ISO date as `MM/DD/YYYY`. Anything unparseable passes through
/// unchanged so a malformed cell is at least visible.
pub fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date.trim(), ISO_DATE) {
        Ok(parsed) => parsed.format(US_DATE).to_string(),
        Err(_) => date.to_string(),
    }
}

/// Normalizes user-entered or timestamp input to ISO `YYYY-MM-DD`. Accepts ISO dates
/// (returned as-is), `M/D/YYYY`, and RFC 3339 timestamps; anything else passes through.
pub fn to_iso_date(input: &str) -> String {
    let trimmed = input.trim();
    if NaiveDate::parse_from_str(trimmed, ISO_DATE).is_ok() {
        return trimmed.to_string();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, US_DATE) {
        return parsed.format(ISO_DATE).to_string();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed.date_naive().format(ISO_DATE).to_string();
    }
    input.to_string()
}

/// Extracts a decimal amount from user input, ignoring currency decoration like `$` and
/// commas. Returns `None` when nothing numeric remains.
pub fn parse_currency_input(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    Decimal::from_str(&cleaned).ok()
}
