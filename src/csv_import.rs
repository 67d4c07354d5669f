//! CSV batch import.
//!
//! A batch file has a header row naming its columns; order does not matter.
//! Every data row becomes one [`NewContribution`] stamped with the upload's
//! batch month. Any bad row rejects the whole file.

use crate::error::{AppError, Result, msg};
use crate::models::{Amount, BatchMonth, NewContribution, parse_day};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    SssNo,
    Name,
    Ss,
    Ec,
    Total,
    SbrNo,
    SbrDate,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let normalized = header
            .trim()
            .trim_start_matches('\u{feff}')
            .to_ascii_lowercase()
            .replace(['-', '.'], "_");
        match normalized.as_str() {
            "sss_no" | "sssno" | "sss no" | "sss" | "sss_number" => Some(Column::SssNo),
            "name" | "employee" | "employee name" => Some(Column::Name),
            "ss" => Some(Column::Ss),
            "ec" => Some(Column::Ec),
            "total" => Some(Column::Total),
            "sbr_no" | "sbr no" => Some(Column::SbrNo),
            "sbr_date" | "sbr date" => Some(Column::SbrDate),
            _ => None,
        }
    }
}

/// Header positions resolved from the first row.
#[derive(Debug, Default)]
struct Layout {
    sss_no: Option<usize>,
    name: Option<usize>,
    ss: Option<usize>,
    ec: Option<usize>,
    total: Option<usize>,
    sbr_no: Option<usize>,
    sbr_date: Option<usize>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut layout = Layout::default();
        for (idx, header) in headers.iter().enumerate() {
            let slot = match Column::from_header(header) {
                Some(Column::SssNo) => &mut layout.sss_no,
                Some(Column::Name) => &mut layout.name,
                Some(Column::Ss) => &mut layout.ss,
                Some(Column::Ec) => &mut layout.ec,
                Some(Column::Total) => &mut layout.total,
                Some(Column::SbrNo) => &mut layout.sbr_no,
                Some(Column::SbrDate) => &mut layout.sbr_date,
                None => continue,
            };
            // First occurrence wins.
            slot.get_or_insert(idx);
        }

        let missing: Vec<String> = [
            ("sss_no", layout.sss_no),
            ("name", layout.name),
            ("ss", layout.ss),
            ("ec", layout.ec),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| format!("Missing required column: {}", name))
        .collect();

        if missing.is_empty() {
            Ok(layout)
        } else {
            Err(AppError::Validation(missing))
        }
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_row(
    record: &csv::StringRecord,
    layout: &Layout,
    month: BatchMonth,
) -> std::result::Result<NewContribution, Vec<String>> {
    let mut errors = Vec::new();

    let mut amount = |idx: Option<usize>, field: &str, required: bool| -> Option<Amount> {
        match cell(record, idx) {
            Some(raw) => match raw.parse::<Amount>() {
                Ok(value) => Some(value),
                Err(e) => {
                    errors.push(format!("{} {}", field, e.reason));
                    None
                }
            },
            None => {
                if required {
                    errors.push(format!("{} is required", field));
                }
                None
            }
        }
    };

    let ss = amount(layout.ss, "ss", true);
    let ec = amount(layout.ec, "ec", true);
    let total = amount(layout.total, "total", false);

    let sbr_date = match cell(record, layout.sbr_date).map(parse_day) {
        Some(Ok(date)) => Some(date),
        Some(Err(e)) => {
            errors.push(format!("sbr_date {}", e));
            None
        }
        None => None,
    };

    let (Some(ss), Some(ec)) = (ss, ec) else {
        return Err(errors);
    };

    let row = NewContribution {
        batch_date: month,
        sss_no: cell(record, layout.sss_no).unwrap_or_default().to_string(),
        name: cell(record, layout.name).unwrap_or_default().to_string(),
        ss,
        ec,
        total,
        sbr_no: cell(record, layout.sbr_no).map(String::from),
        sbr_date,
    };
    errors.extend(row.problems());

    if errors.is_empty() { Ok(row) } else { Err(errors) }
}

/// Parse a batch file into rows for `month`.
///
/// Rows are numbered from 1, counting data rows only. Blank lines are
/// skipped and do not count.
pub fn parse_batch(bytes: &[u8], month: BatchMonth) -> Result<Vec<NewContribution>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("Unreadable csv file: {}", e)))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::BadRequest(msg::CSV_EMPTY.into()));
    }
    let layout = Layout::from_headers(&headers)?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut number = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                number += 1;
                errors.push(format!("Row {}: {}", number, e));
                continue;
            }
        };
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        number += 1;
        match parse_row(&record, &layout, month) {
            Ok(row) => rows.push(row),
            Err(problems) => {
                errors.extend(problems.into_iter().map(|p| format!("Row {}: {}", number, p)));
            }
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    if rows.is_empty() {
        return Err(AppError::BadRequest(msg::CSV_EMPTY.into()));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn may() -> BatchMonth {
        BatchMonth::new(2024, 5).unwrap()
    }

    fn validation_errors(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn parses_rows_with_aliased_headers_in_any_order() {
        let csv = "Name,SSS No,EC,SS\n\
                   \"Dela Cruz, Juan\",34-1234567-8,30.00,\"₱1,125.00\"\n\
                   \n\
                   Santos Maria,34-7654321-0,10,570\n";
        let rows = parse_batch(csv.as_bytes(), may()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Dela Cruz, Juan");
        assert_eq!(rows[0].sss_no, "34-1234567-8");
        assert_eq!(rows[0].resolved_total().to_string(), "1155.00");
        assert_eq!(rows[1].resolved_total().to_string(), "580.00");
        assert!(rows.iter().all(|r| r.batch_date == may()));
    }

    #[test]
    fn explicit_total_and_sbr_columns_are_kept() {
        let csv = "sss_no,name,ss,ec,total,sbr_no,sbr_date\n\
                   34-1,Reyes Ana,100,10,115,SBR-7,2024-06-10\n";
        let rows = parse_batch(csv.as_bytes(), may()).unwrap();
        assert_eq!(rows[0].resolved_total().centavos(), 11500);
        assert_eq!(rows[0].sbr_no.as_deref(), Some("SBR-7"));
        assert_eq!(rows[0].sbr_date.map(|d| d.to_string()).as_deref(), Some("2024-06-10"));
    }

    #[test]
    fn row_errors_reject_the_whole_file() {
        let csv = "sss_no,name,ss,ec\n\
                   34-1,Reyes Ana,100,10\n\
                   ,Lopez Ben,abc,10\n";
        let errors = validation_errors(parse_batch(csv.as_bytes(), may()).unwrap_err());
        assert!(errors.iter().all(|e| e.starts_with("Row 2:")));
        assert!(errors.iter().any(|e| e.contains("ss")));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let csv = "sss_no,name,ss\n34-1,Reyes Ana,100\n";
        let errors = validation_errors(parse_batch(csv.as_bytes(), may()).unwrap_err());
        assert_eq!(errors, vec!["Missing required column: ec".to_string()]);
    }

    #[test]
    fn empty_files_are_rejected() {
        assert!(matches!(
            parse_batch(b"", may()),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_batch(b"sss_no,name,ss,ec\n\n", may()),
            Err(AppError::BadRequest(_))
        ));
    }
}
