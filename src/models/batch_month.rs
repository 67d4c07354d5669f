//! Month-granularity batch identifier.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid batch date '{0}': expected YYYY-MM or YYYY-MM-DD")]
pub struct BatchMonthError(pub String);

/// A calendar month, always stored as its first day (`YYYY-MM-01`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchMonth(NaiveDate);

impl BatchMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(BatchMonth)
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        BatchMonth(date.with_day(1).unwrap_or(date))
    }

    /// Short label used in tables, e.g. `Mar 2024`.
    pub fn short_label(self) -> String {
        self.0.format("%b %Y").to_string()
    }

    /// Long label used in report headers, e.g. `March 2024`.
    pub fn long_label(self) -> String {
        self.0.format("%B %Y").to_string()
    }
}

impl fmt::Display for BatchMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for BatchMonth {
    type Err = BatchMonthError;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD`, or any string starting with a
    /// `YYYY-MM-DD` date such as an ISO timestamp.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        let err = || BatchMonthError(input.to_string());

        if let Some(day) = s.get(..10)
            && let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        {
            return Ok(BatchMonth::containing(date));
        }

        NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
            .map(BatchMonth)
            .map_err(|_| err())
    }
}

impl Serialize for BatchMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BatchMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for BatchMonth {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for BatchMonth {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: BatchMonthError| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_first_of_month() {
        let m: BatchMonth = "2024-03-17".parse().unwrap();
        assert_eq!(m.to_string(), "2024-03-01");
        assert_eq!("2024-03".parse::<BatchMonth>().unwrap(), m);
        assert_eq!("2024-03-31T16:00:00.000Z".parse::<BatchMonth>().unwrap(), m);
    }

    #[test]
    fn rejects_bad_input() {
        for bad in ["", "2024", "2024-13", "March 2024", "2024-02-30"] {
            assert!(bad.parse::<BatchMonth>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn labels() {
        let feb = BatchMonth::new(2024, 2).unwrap();
        assert_eq!(
            BatchMonth::containing(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            feb
        );
        assert_eq!(feb.short_label(), "Feb 2024");
        assert_eq!(feb.long_label(), "February 2024");
    }
}
