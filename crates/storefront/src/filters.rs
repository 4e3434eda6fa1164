//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use urban_threads_core::Price;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a price as US dollars with two decimal places.
///
/// Usage in templates: `{{ product.price|usd }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn usd(price: &Price, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_usd(price))
}

pub(crate) fn format_usd(price: &Price) -> String {
    format!("${:.2}", price.amount())
}
