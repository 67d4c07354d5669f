use axum::{
    extract::{Extension, Multipart, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::csv_import;
use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Path, Query};
use crate::middleware::UserContext;
use crate::models::{
    BatchDeleteRequest, BatchMonth, ContributionRecord, NewContribution, PdfQuery, Permission,
    RecordFilter, RecordTotals, UpdateSbr, ValidateBatchQuery,
};
use crate::pdf::{ReportOptions, render_contribution_report};

pub const COUNT_HEADER: &str = "nodex-generated-count";
pub const TOTAL_HEADER: &str = "nodex-generated-total";

fn parse_month(raw: &str) -> Result<BatchMonth> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation(vec![msg::BATCH_DATE_MISSING.into()]));
    }
    raw.parse::<BatchMonth>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn totals_headers(totals: RecordTotals) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let count = HeaderValue::from_str(&totals.count.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let total = HeaderValue::from_str(&totals.total.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    headers.insert(HeaderName::from_static(COUNT_HEADER), count);
    headers.insert(HeaderName::from_static(TOTAL_HEADER), total);
    Ok(headers)
}

pub async fn list_records(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Query(filter): Query<RecordFilter>,
) -> Result<(HeaderMap, Json<Vec<ContributionRecord>>)> {
    ctx.require(Permission::View)?;
    let query = filter.parse()?;

    let conn = state.db.get()?;
    let records = queries::list_contributions(&conn, &query)?;
    let headers = totals_headers(RecordTotals::of(&records))?;
    Ok((headers, Json(records)))
}

pub async fn get_record(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<ContributionRecord>> {
    ctx.require(Permission::View)?;
    let conn = state.db.get()?;
    let record = queries::get_contribution(&conn, id)?.or_not_found(msg::RECORD_NOT_FOUND)?;
    Ok(Json(record))
}

pub async fn create_record(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Json(input): Json<NewContribution>,
) -> Result<Json<ContributionRecord>> {
    ctx.require(Permission::Upload)?;
    input.validate()?;

    let conn = state.db.get()?;
    let record = queries::create_contribution(&conn, &input)?;
    tracing::info!(id = record.id, batch = %record.batch_date, user = %ctx.user.email, "Record created");
    Ok(Json(record))
}

pub async fn update_sbr(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateSbr>,
) -> Result<Json<ContributionRecord>> {
    ctx.require(Permission::Edit)?;
    input.validate()?;

    let conn = state.db.get()?;
    let record = queries::update_contribution_sbr(&conn, id, &input)?
        .or_not_found(msg::RECORD_NOT_FOUND)?;
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    ctx.require(Permission::Delete)?;
    let conn = state.db.get()?;
    if !queries::delete_contribution(&conn, id)? {
        return Err(AppError::NotFound(msg::RECORD_NOT_FOUND.into()));
    }
    Ok(Json(json!({ "status": "success", "message": "Record deleted" })))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Json(input): Json<BatchDeleteRequest>,
) -> Result<Json<Value>> {
    ctx.require(Permission::Delete)?;
    let month = parse_month(&input.date)?;

    let conn = state.db.get()?;
    let deleted = queries::delete_batch(&conn, month)?;
    tracing::info!(batch = %month, deleted, user = %ctx.user.email, "Batch deleted");
    Ok(Json(json!({ "status": "success", "deleted": deleted })))
}

pub async fn validate_batch(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Query(query): Query<ValidateBatchQuery>,
) -> Result<Json<Value>> {
    ctx.require(Permission::View)?;
    let month = parse_month(&query.batch_date)?;

    let conn = state.db.get()?;
    let exists = queries::batch_exists(&conn, month)?;
    Ok(Json(json!({ "exists": exists })))
}

/// Fields collected from the upload form.
#[derive(Default)]
struct UploadForm {
    csv: Option<Vec<u8>>,
    batch_date: Option<String>,
    overwrite: bool,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "csv" | "file" => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.csv = Some(bytes.to_vec());
                }
                "batchDate" | "batch_date" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.batch_date = Some(text);
                }
                "overwrite" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.overwrite = matches!(text.trim(), "true" | "1" | "yes" | "on");
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

pub async fn upload_batch(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    ctx.require(Permission::Upload)?;
    let form = UploadForm::read(multipart).await?;

    let batch_date = form.batch_date.filter(|s| !s.trim().is_empty());
    let (csv, batch_date) = match (form.csv, batch_date) {
        (Some(csv), Some(batch_date)) => (csv, batch_date),
        (csv, batch_date) => {
            let mut errors = Vec::new();
            if csv.is_none() {
                errors.push(msg::CSV_MISSING.to_string());
            }
            if batch_date.is_none() {
                errors.push(msg::BATCH_DATE_MISSING.to_string());
            }
            return Err(AppError::Validation(errors));
        }
    };

    let month = parse_month(&batch_date)?;
    let rows = csv_import::parse_batch(&csv, month)?;

    let mut conn = state.db.get()?;
    let outcome = if form.overwrite {
        queries::replace_batch(&mut conn, month, &rows)?
    } else {
        queries::insert_batch(&mut conn, month, &rows)?
    };

    tracing::info!(
        batch = %month,
        inserted = outcome.inserted,
        replaced = outcome.deleted,
        user = %ctx.user.email,
        "Batch uploaded"
    );

    Ok(Json(json!({
        "status": "success",
        "message": format!("Uploaded {} record(s) for {}", outcome.inserted, month.long_label()),
        "batchDate": month,
        "inserted": outcome.inserted,
        "deleted": outcome.deleted,
    })))
}

pub async fn generate_pdf(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Query(query): Query<PdfQuery>,
) -> Result<Response> {
    ctx.require(Permission::Generate)?;
    let filter = query.filter.parse()?;

    let conn = state.db.get()?;
    let records = queries::list_contributions(&conn, &filter)?;
    if records.len() >= state.pdf_max_rows {
        return Err(AppError::BadRequest(format!(
            "Too many records to print ({}). Narrow the search to fewer than {} rows.",
            records.len(),
            state.pdf_max_rows
        )));
    }
    let signatories = queries::get_signatories(&conn)?;
    drop(conn);

    let options = ReportOptions {
        display_name: query.display_name,
        display_sss_no: query.display_sss_no,
        display_coverage: query.display_coverage,
        generated_on: Some(chrono::Local::now().date_naive()),
    };
    let bytes = render_contribution_report(&records, &signatories, &options);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"contributions.pdf\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
