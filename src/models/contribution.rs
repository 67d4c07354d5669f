use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::{Amount, BatchMonth};
use crate::error::{AppError, Result};

/// One employee's contribution line for a batch month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub id: i64,
    #[serde(rename = "batchDate")]
    pub batch_date: BatchMonth,
    pub sss_no: String,
    pub name: String,
    /// Employee share.
    pub ss: Amount,
    /// Employer share.
    pub ec: Amount,
    pub total: Amount,
    pub sbr_no: Option<String>,
    pub sbr_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Treats empty strings as absent; anything else must start with `YYYY-MM-DD`.
fn deserialize_optional_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_day(s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn deserialize_optional_trimmed<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Parses `YYYY-MM-DD`, ignoring any trailing time component.
pub fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    s.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| format!("invalid date '{}': expected YYYY-MM-DD", s))
}

/// Input for a single hand-entered record, or one parsed CSV row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContribution {
    #[serde(rename = "batchDate", alias = "batch_date")]
    pub batch_date: BatchMonth,
    #[serde(default)]
    pub sss_no: String,
    #[serde(default)]
    pub name: String,
    pub ss: Amount,
    pub ec: Amount,
    /// Computed as `ss + ec` when absent.
    #[serde(default)]
    pub total: Option<Amount>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub sbr_no: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub sbr_date: Option<NaiveDate>,
}

impl NewContribution {
    /// Field-level problems, empty when the input is acceptable.
    pub fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.sss_no.trim().is_empty() {
            errors.push("The sss no field is required.".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("The name field is required.".to_string());
        }
        if self.ss.is_negative() {
            errors.push("The ss amount cannot be negative.".to_string());
        }
        if self.ec.is_negative() {
            errors.push("The ec amount cannot be negative.".to_string());
        }
        match self.total {
            Some(total) if total.is_negative() => {
                errors.push("The total amount cannot be negative.".to_string());
            }
            None if self.ss.checked_add(self.ec).is_none() => {
                errors.push("The total amount is out of range.".to_string());
            }
            _ => {}
        }
        errors
    }

    pub fn validate(&self) -> Result<()> {
        let errors = self.problems();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    pub fn resolved_total(&self) -> Amount {
        self.total
            .or_else(|| self.ss.checked_add(self.ec))
            .unwrap_or(Amount::ZERO)
    }
}

/// Absent keeps the stored value; `null` or `""` clears it.
fn deserialize_clearable_text<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_trimmed(deserializer).map(Some)
}

fn deserialize_clearable_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_date(deserializer).map(Some)
}

/// Body of the SBR edit form. The dashboard sends the other editable
/// columns alongside the SBR fields, so those are accepted here too.
///
/// The SBR fields are tri-state: `None` leaves the column alone and
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSbr {
    #[serde(default, deserialize_with = "deserialize_clearable_text")]
    pub sbr_no: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_clearable_date")]
    pub sbr_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub sss_no: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
    pub name: Option<String>,
    #[serde(default)]
    pub ss: Option<Amount>,
    #[serde(default)]
    pub ec: Option<Amount>,
    #[serde(default)]
    pub total: Option<Amount>,
}

impl UpdateSbr {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (field, amount) in [("ss", self.ss), ("ec", self.ec), ("total", self.total)] {
            if amount.is_some_and(Amount::is_negative) {
                errors.push(format!("The {} amount cannot be negative.", field));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Query string accepted by the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFilter {
    #[serde(rename = "sssNo", default)]
    pub sss_no: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Parsed and normalized record filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub sss_no: Option<String>,
    pub name: Option<String>,
    pub from: Option<BatchMonth>,
    pub to: Option<BatchMonth>,
}

impl RecordFilter {
    pub fn parse(&self) -> Result<RecordQuery> {
        fn text(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        }
        fn month(value: &Option<String>, field: &str) -> Result<Option<BatchMonth>> {
            match value.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => s
                    .parse()
                    .map(Some)
                    .map_err(|_| AppError::BadRequest(format!("Invalid '{}' date: {}", field, s))),
            }
        }

        let query = RecordQuery {
            sss_no: text(&self.sss_no),
            name: text(&self.name),
            from: month(&self.from, "from")?,
            to: month(&self.to, "to")?,
        };
        if let (Some(from), Some(to)) = (query.from, query.to)
            && from > to
        {
            return Err(AppError::BadRequest("'from' must not be after 'to'".into()));
        }
        Ok(query)
    }
}

/// Report header overrides sent alongside the list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PdfQuery {
    #[serde(flatten)]
    pub filter: RecordFilter,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "displaySSSNo", default)]
    pub display_sss_no: Option<String>,
    #[serde(rename = "displayCoverage", default)]
    pub display_coverage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateBatchQuery {
    #[serde(rename = "batchDate", alias = "batch_date")]
    pub batch_date: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub date: String,
}

/// Count and sum over a filtered record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordTotals {
    pub count: usize,
    pub total: Amount,
}

impl RecordTotals {
    pub fn of(records: &[ContributionRecord]) -> Self {
        let total = records
            .iter()
            .fold(Amount::ZERO, |acc, r| acc.checked_add(r.total).unwrap_or(acc));
        Self {
            count: records.len(),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_contribution_computes_missing_total() {
        let input: NewContribution = serde_json::from_value(serde_json::json!({
            "batchDate": "2024-05-01",
            "sss_no": "34-1234567-8",
            "name": "Dela Cruz, Juan",
            "ss": "₱1,125.00",
            "ec": 30,
            "sbr_no": "",
            "sbr_date": ""
        }))
        .unwrap();
        assert!(input.problems().is_empty());
        assert_eq!(input.resolved_total().to_string(), "1155.00");
        assert_eq!(input.sbr_no, None);
        assert_eq!(input.sbr_date, None);
    }

    #[test]
    fn new_contribution_reports_every_missing_field() {
        let input: NewContribution = serde_json::from_value(serde_json::json!({
            "batchDate": "2024-05",
            "ss": "-1",
            "ec": "0"
        }))
        .unwrap();
        let problems = input.problems();
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("sss no")));
        assert!(problems.iter().any(|p| p.contains("name")));
        assert!(problems.iter().any(|p| p.contains("ss amount")));
    }

    #[test]
    fn filter_rejects_inverted_range() {
        let filter = RecordFilter {
            from: Some("2024-06-01".into()),
            to: Some("2024-01-01".into()),
            ..Default::default()
        };
        assert!(filter.parse().is_err());
    }

    #[test]
    fn filter_drops_blank_values() {
        let filter = RecordFilter {
            sss_no: Some("  ".into()),
            name: Some(" cruz ".into()),
            ..Default::default()
        };
        let query = filter.parse().unwrap();
        assert_eq!(query.sss_no, None);
        assert_eq!(query.name.as_deref(), Some("cruz"));
    }

    #[test]
    fn sbr_date_accepts_iso_timestamp() {
        let update: UpdateSbr = serde_json::from_value(serde_json::json!({
            "sbr_no": "SBR-0091",
            "sbr_date": "2024-07-15T00:00:00.000Z",
            "total": "₱1500.00"
        }))
        .unwrap();
        assert_eq!(update.sbr_date, Some(NaiveDate::from_ymd_opt(2024, 7, 15)));
        assert_eq!(update.total.map(Amount::centavos), Some(150000));
    }

    #[test]
    fn sbr_fields_distinguish_absent_from_cleared() {
        let untouched: UpdateSbr = serde_json::from_value(serde_json::json!({ "name": "Ana" })).unwrap();
        assert_eq!(untouched.sbr_no, None);
        assert_eq!(untouched.sbr_date, None);

        let cleared: UpdateSbr =
            serde_json::from_value(serde_json::json!({ "sbr_no": "", "sbr_date": null })).unwrap();
        assert_eq!(cleared.sbr_no, Some(None));
        assert_eq!(cleared.sbr_date, Some(None));
    }
}
