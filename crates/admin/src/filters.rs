//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use rust_decimal::Decimal;
use tradedesk_core::Money;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a decimal amount as yen.
///
/// Usage in templates: `{{ line.unit_price|yen }}`. Values that are not
/// numbers are shown unchanged.
#[askama::filter_fn]
pub fn yen(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(raw
        .trim()
        .parse::<Decimal>()
        .map_or(raw, |amount| Money::new(amount).to_string()))
}

/// Shows a dash for blank text.
///
/// Usage in templates: `{{ customer.phone|or_dash }}`
#[askama::filter_fn]
pub fn or_dash(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    Ok(if text.trim().is_empty() {
        "-".to_string()
    } else {
        text
    })
}
