use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, ToSql, TransactionBehavior, params, types::Value};
use uuid::Uuid;

use crate::crypto::{generate_token, hash_secret, token_prefix};
use crate::error::{AppError, Result, msg};
use crate::models::*;

use super::from_row::{
    API_TOKEN_COLS, CONTRIBUTION_COLS, FromRow, SIGNATORIES_COLS, USER_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: Value,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: impl Into<Value>) -> Self {
        Self {
            table,
            id: id.into(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set_opt<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.fields.push((column, v.into()));
        }
        self
    }

    /// `Some(None)` writes NULL; `None` leaves the column untouched.
    fn set_nullable<V: Into<Value>>(
        mut self,
        column: &'static str,
        value: Option<Option<V>>,
    ) -> Self {
        if let Some(v) = value {
            self.fields.push((column, v.map_or(Value::Null, Into::into)));
        }
        self
    }

    /// Runs the update and returns the row through `RETURNING`.
    /// With nothing to set, the current row is returned unchanged.
    fn execute_returning<T: FromRow>(
        mut self,
        conn: &Connection,
        returning_cols: &str,
    ) -> Result<Option<T>> {
        if self.fields.is_empty() {
            let sql = format!("SELECT {} FROM {} WHERE id = ?1", returning_cols, self.table);
            return query_one(conn, &sql, &[&self.id]);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id);
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? RETURNING {}",
            self.table,
            sets.join(", "),
            returning_cols
        );
        conn.query_row(&sql, rusqlite::params_from_iter(values), T::from_row)
            .optional()
            .map_err(Into::into)
    }
}

/// Escape LIKE wildcards and wrap for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// ============ Users & Tokens ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let permissions = serde_json::to_string(&input.permissions)?;

    conn.execute(
        "INSERT INTO users (id, email, name, permissions, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, input.email.trim(), input.name.trim(), &permissions, now],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict(format!("A user with email {} already exists", input.email.trim()))
        }
        other => other.into(),
    })?;

    Ok(User {
        id,
        email: input.email.trim().to_string(),
        name: input.name.trim().to_string(),
        user_permissions: input.permissions.clone(),
        created_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

/// Issue a new bearer token. Returns the stored metadata and the plaintext token.
pub fn create_api_token(conn: &Connection, user_id: &str) -> Result<(ApiToken, String)> {
    let id = gen_id();
    let now = now();
    let token = generate_token();
    let prefix = token_prefix(&token);

    conn.execute(
        "INSERT INTO api_tokens (id, user_id, token_prefix, token_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, user_id, &prefix, hash_secret(&token), now],
    )?;

    Ok((
        ApiToken {
            id,
            user_id: user_id.to_string(),
            prefix,
            created_at: now,
            last_used_at: None,
            revoked_at: None,
        },
        token,
    ))
}

/// Resolve a bearer token to its user. Revoked tokens resolve to nothing.
pub fn get_user_by_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    let record: Option<ApiToken> = query_one(
        conn,
        &format!(
            "SELECT {} FROM api_tokens WHERE token_hash = ?1 AND revoked_at IS NULL",
            API_TOKEN_COLS
        ),
        &[&hash_secret(token)],
    )?;

    let Some(record) = record else {
        return Ok(None);
    };

    // Best effort; a failed touch must not fail authentication.
    let _ = conn.execute(
        "UPDATE api_tokens SET last_used_at = ?1 WHERE id = ?2",
        params![now(), &record.id],
    );

    get_user_by_id(conn, &record.user_id)
}

pub fn revoke_api_token(conn: &Connection, token_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE api_tokens SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL",
        params![now(), token_id],
    )?;
    Ok(affected > 0)
}

// ============ Contributions ============

fn insert_contribution(
    conn: &Connection,
    batch_date: BatchMonth,
    input: &NewContribution,
    now: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO contributions (batch_date, sss_no, name, ss, ec, total, sbr_no, sbr_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            batch_date,
            input.sss_no.trim(),
            input.name.trim(),
            input.ss,
            input.ec,
            input.resolved_total(),
            &input.sbr_no,
            input.sbr_date,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_contribution(conn: &Connection, input: &NewContribution) -> Result<ContributionRecord> {
    let id = insert_contribution(conn, input.batch_date, input, now())?;
    get_contribution(conn, id)?
        .ok_or_else(|| AppError::Internal("Contribution missing after insert".into()))
}

pub fn get_contribution(conn: &Connection, id: i64) -> Result<Option<ContributionRecord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM contributions WHERE id = ?1", CONTRIBUTION_COLS),
        &[&id],
    )
}

/// List records matching the filter, newest batch first.
pub fn list_contributions(conn: &Connection, query: &RecordQuery) -> Result<Vec<ContributionRecord>> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(ref sss_no) = query.sss_no {
        conditions.push("sss_no LIKE ? ESCAPE '\\'");
        values.push(like_pattern(sss_no).into());
    }
    if let Some(ref name) = query.name {
        conditions.push("name LIKE ? ESCAPE '\\'");
        values.push(like_pattern(name).into());
    }
    if let Some(from) = query.from {
        conditions.push("batch_date >= ?");
        values.push(from.to_string().into());
    }
    if let Some(to) = query.to {
        conditions.push("batch_date <= ?");
        values.push(to.to_string().into());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM contributions {} ORDER BY batch_date DESC, name ASC, id ASC",
        CONTRIBUTION_COLS, where_clause
    );

    let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
    query_all(conn, &sql, &params)
}

pub fn update_contribution_sbr(
    conn: &Connection,
    id: i64,
    input: &UpdateSbr,
) -> Result<Option<ContributionRecord>> {
    UpdateBuilder::new("contributions", id)
        .with_updated_at()
        .set_nullable("sbr_no", input.sbr_no.clone())
        .set_nullable(
            "sbr_date",
            input
                .sbr_date
                .map(|d| d.map(|d| d.format("%Y-%m-%d").to_string())),
        )
        .set_opt("sss_no", input.sss_no.clone())
        .set_opt("name", input.name.clone())
        .set_opt("ss", input.ss.map(Amount::centavos))
        .set_opt("ec", input.ec.map(Amount::centavos))
        .set_opt("total", input.total.map(Amount::centavos))
        .execute_returning(conn, CONTRIBUTION_COLS)
}

pub fn delete_contribution(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM contributions WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

pub fn batch_exists(conn: &Connection, month: BatchMonth) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM contributions WHERE batch_date = ?1 LIMIT 1",
            params![month],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

/// Remove every record in the given month. Returns the number removed.
pub fn delete_batch(conn: &Connection, month: BatchMonth) -> Result<usize> {
    Ok(conn.execute("DELETE FROM contributions WHERE batch_date = ?1", params![month])?)
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BatchImport {
    pub deleted: usize,
    pub inserted: usize,
}

/// Import a batch into an empty month.
///
/// Fails with `Conflict` if the month already holds records. The check and
/// the inserts share one immediate transaction.
pub fn insert_batch(
    conn: &mut Connection,
    month: BatchMonth,
    rows: &[NewContribution],
) -> Result<BatchImport> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if batch_exists(&tx, month)? {
        return Err(AppError::Conflict(msg::BATCH_EXISTS.into()));
    }
    let now = now();
    for row in rows {
        insert_contribution(&tx, month, row, now)?;
    }
    tx.commit()?;
    Ok(BatchImport {
        deleted: 0,
        inserted: rows.len(),
    })
}

/// Replace a month's records with `rows` in a single transaction.
///
/// Either the old batch is gone and the new one is in place, or nothing
/// changed.
pub fn replace_batch(
    conn: &mut Connection,
    month: BatchMonth,
    rows: &[NewContribution],
) -> Result<BatchImport> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let deleted = delete_batch(&tx, month)?;
    let now = now();
    for row in rows {
        insert_contribution(&tx, month, row, now)?;
    }
    tx.commit()?;
    Ok(BatchImport {
        deleted,
        inserted: rows.len(),
    })
}

// ============ Signatories ============

pub fn get_signatories(conn: &Connection) -> Result<Signatories> {
    Ok(query_one(
        conn,
        &format!("SELECT {} FROM signatories WHERE id = 1", SIGNATORIES_COLS),
        &[],
    )?
    .unwrap_or_default())
}

pub fn save_signatories(conn: &Connection, signatories: &Signatories) -> Result<Signatories> {
    conn.execute(
        "INSERT INTO signatories (id, payroll_incharge, vp_finance, updated_at) VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET payroll_incharge = excluded.payroll_incharge,
             vp_finance = excluded.vp_finance, updated_at = excluded.updated_at",
        params![&signatories.payroll_incharge, &signatories.vp_finance, now()],
    )?;
    Ok(signatories.clone())
}
