//! Dashboard-side formatting and search helpers.

use crate::error::{ClientError, Result};
use crate::types::RecordFilter;

/// Prefix shown before every amount in the dashboard.
pub const CURRENCY_SYMBOL: &str = "₱";

/// Format a raw amount as shown in tables, e.g. `1125.00` → `₱1125.00`.
pub fn display_amount(raw: &str) -> String {
    format!("{}{}", CURRENCY_SYMBOL, raw)
}

/// Undo [`display_amount`] so an edited value can be submitted again.
/// Values without the prefix pass through unchanged.
pub fn strip_currency_symbol(display: &str) -> &str {
    display.strip_prefix(CURRENCY_SYMBOL).unwrap_or(display)
}

/// What a free-text search box entry refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKeyword {
    /// Blank input: no keyword filter.
    Empty,
    /// Contains a digit: matched against SSS numbers.
    SssNo(String),
    /// No digits: matched against names.
    Name(String),
}

impl SearchKeyword {
    /// Classify a keyword. Mixing digits and letters is rejected.
    pub fn classify(keyword: &str) -> Result<Self> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(SearchKeyword::Empty);
        }
        let has_digit = keyword.chars().any(|c| c.is_ascii_digit());
        let has_letter = keyword.chars().any(|c| c.is_ascii_alphabetic());
        match (has_digit, has_letter) {
            (true, true) => Err(ClientError::InvalidKeyword),
            (true, false) => Ok(SearchKeyword::SssNo(keyword.to_string())),
            (false, _) => Ok(SearchKeyword::Name(keyword.to_string())),
        }
    }

    /// Build the list filter for this keyword over an optional month range.
    pub fn into_filter(self, from: Option<String>, to: Option<String>) -> RecordFilter {
        let (sss_no, name) = match self {
            SearchKeyword::Empty => (None, None),
            SearchKeyword::SssNo(s) => (Some(s), None),
            SearchKeyword::Name(n) => (None, Some(n)),
        };
        // A range only applies when both ends are set.
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) => (Some(from), Some(to)),
            _ => (None, None),
        };
        RecordFilter {
            sss_no,
            name,
            from,
            to,
        }
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// `2024-05-01` → `May 2024`. Returns `None` for anything else.
pub fn month_label(date: &str) -> Option<String> {
    let mut parts = date.trim().splitn(3, '-');
    let year: u32 = parts.next()?.parse().ok()?;
    let month: usize = parts.next()?.get(..2)?.parse().ok()?;
    let name = MONTH_NAMES.get(month.checked_sub(1)?)?;
    Some(format!("{} {}", name, year))
}

/// Coverage line printed on reports: `May 2024 up to June 2024`.
pub fn coverage_label(from: &str, to: &str) -> Option<String> {
    Some(format!("{} up to {}", month_label(from)?, month_label(to)?))
}
