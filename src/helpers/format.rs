//! Display formatting for the presentation boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Render a money amount with a currency prefix and exactly two decimals.
pub fn format_currency(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// Render a timestamp with sub-second precision stripped.
pub fn format_timestamp(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S").to_string()
}
