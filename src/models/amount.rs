//! Fixed-point peso amounts.
//!
//! Amounts are held as integer centavos. The text form is a plain decimal
//! with two fraction digits (`1234.50`); the display form prefixes the peso
//! sign (`₱1234.50`). Parsing accepts both, plus thousands separators, so a
//! value shown on screen can be submitted back unchanged.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const CURRENCY_SYMBOL: char = '₱';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount '{input}': {reason}")]
pub struct AmountError {
    pub input: String,
    pub reason: &'static str,
}

impl AmountError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_centavos(centavos: i64) -> Self {
        Amount(centavos)
    }

    pub fn centavos(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let unprefixed = trimmed
            .strip_prefix(CURRENCY_SYMBOL)
            .unwrap_or(trimmed)
            .trim_start();
        let (negative, digits) = match unprefixed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, unprefixed),
        };
        if digits.is_empty() {
            return Err(AmountError::new(input, "empty"));
        }

        let (grouped, frac) = digits.split_once('.').unwrap_or((digits, ""));
        let ungrouped = strip_thousands(grouped)
            .ok_or_else(|| AmountError::new(input, "misplaced thousands separator"))?;
        let whole = ungrouped.as_str();

        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::new(input, "no digits"));
        }
        if frac.len() > 2 {
            return Err(AmountError::new(input, "more than two decimal places"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AmountError::new(input, "not a number"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| AmountError::new(input, "out of range"))?
        };
        let frac_value: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or(0) * 10,
            _ => frac.parse::<i64>().unwrap_or(0),
        };

        let centavos = whole_value
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| AmountError::new(input, "out of range"))?;

        Ok(Amount(if negative { -centavos } else { centavos }))
    }
}

/// `1,234,567` → `1234567`. Commas are only accepted between groups of three.
fn strip_thousands(grouped: &str) -> Option<String> {
    if !grouped.contains(',') {
        return Some(grouped.to_string());
    }
    let mut groups = grouped.split(',');
    let lead = groups.next()?;
    if lead.is_empty() || lead.len() > 3 {
        return None;
    }
    if groups.any(|g| g.len() != 3) {
        return None;
    }
    Some(grouped.replace(',', ""))
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        v.checked_mul(100)
            .map(Amount)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        i64::try_from(v)
            .map_err(|_| E::custom("amount out of range"))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // Rounds to centavos through the decimal text form.
        format!("{:.2}", v).parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_prefixed_values() {
        assert_eq!("1234.5".parse::<Amount>().unwrap().centavos(), 123450);
        assert_eq!("₱1,234.50".parse::<Amount>().unwrap().centavos(), 123450);
        assert_eq!(" 760 ".parse::<Amount>().unwrap().centavos(), 76000);
        assert_eq!(".75".parse::<Amount>().unwrap().centavos(), 75);
        assert_eq!("-12.05".parse::<Amount>().unwrap().centavos(), -1205);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "₱", "abc", "1.234", "12a", "1.2.3", "."] {
            assert!(bad.parse::<Amount>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn thousands_separators_must_group_by_three() {
        assert_eq!("1,234,567.89".parse::<Amount>().unwrap().centavos(), 123456789);
        assert_eq!("12,345".parse::<Amount>().unwrap().centavos(), 1234500);
        for bad in ["1,2,3", ",123", "1234,567", "1,23", "12,345.6,7", "1,"] {
            assert!(bad.parse::<Amount>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn displayed_value_parses_back() {
        let amount: Amount = "1350.00".parse().unwrap();
        let shown = format!("{}{}", CURRENCY_SYMBOL, amount);
        assert_eq!(shown, "₱1350.00");
        assert_eq!(shown.parse::<Amount>().unwrap(), amount);
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let a: Amount = serde_json::from_str("\"₱42.10\"").unwrap();
        let b: Amount = serde_json::from_str("42.1").unwrap();
        let c: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(a.centavos(), 4210);
        assert_eq!(b.centavos(), 4210);
        assert_eq!(c.centavos(), 4200);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"42.10\"");
    }
}
