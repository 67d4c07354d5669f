//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Decode a JSON text column, surfacing bad data as a column type error.
fn parse_json<T: serde::de::DeserializeOwned>(
    row: &Row,
    col: usize,
    col_name: &str,
) -> rusqlite::Result<T> {
    let text: String = row.get(col)?;
    serde_json::from_str(&text).map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, permissions, created_at";

pub const API_TOKEN_COLS: &str =
    "id, user_id, token_prefix, created_at, last_used_at, revoked_at";

pub const CONTRIBUTION_COLS: &str =
    "id, batch_date, sss_no, name, ss, ec, total, sbr_no, sbr_date, created_at, updated_at";

pub const SIGNATORIES_COLS: &str = "payroll_incharge, vp_finance";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            user_permissions: parse_json(row, 3, "permissions")?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for ApiToken {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ApiToken {
            id: row.get(0)?,
            user_id: row.get(1)?,
            prefix: row.get(2)?,
            created_at: row.get(3)?,
            last_used_at: row.get(4)?,
            revoked_at: row.get(5)?,
        })
    }
}

impl FromRow for ContributionRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ContributionRecord {
            id: row.get(0)?,
            batch_date: row.get(1)?,
            sss_no: row.get(2)?,
            name: row.get(3)?,
            ss: row.get(4)?,
            ec: row.get(5)?,
            total: row.get(6)?,
            sbr_no: row.get(7)?,
            sbr_date: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl FromRow for Signatories {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Signatories {
            payroll_incharge: row.get(0)?,
            vp_finance: row.get(1)?,
        })
    }
}
