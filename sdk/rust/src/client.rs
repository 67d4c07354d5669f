//! HTTP client for the contribution records dashboard.

use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use crate::error::{AUTH_REQUIRED_MESSAGE, ClientError, Result, map_status_to_error};
use crate::types::{
    ContributionRecord, NewRecord, OverwriteConfirm, PDF_ROW_LIMIT, PdfOptions, RecordFilter,
    RecordPage, SbrUpdate, Signatories, UploadOutcome, UploadResponse, UserProfile,
};

const COUNT_HEADER: &str = "nodex-generated-count";
const TOTAL_HEADER: &str = "nodex-generated-total";

/// Authenticated client for one staff session.
#[derive(Clone)]
pub struct DashboardClient {
    base_url: String,
    token: String,
    http: HttpClient,
}

impl DashboardClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http: HttpClient::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The signed-in user and the permissions that gate dashboard actions.
    pub async fn profile(&self) -> Result<UserProfile> {
        self.get_json("/api/user/v1", &[]).await
    }

    /// Filtered listing plus the count and total the server reports in headers.
    pub async fn list_records(&self, filter: &RecordFilter) -> Result<RecordPage> {
        let response = self
            .send(self.request(reqwest::Method::GET, "/api/record/v1").query(&filter.query_pairs()))
            .await?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let count = header(COUNT_HEADER).and_then(|c| c.parse::<usize>().ok());
        let total = header(TOTAL_HEADER);

        let records: Vec<ContributionRecord> = read_json(response).await?;
        Ok(RecordPage {
            count: count.unwrap_or(records.len()),
            total,
            records,
        })
    }

    pub async fn get_record(&self, id: i64) -> Result<ContributionRecord> {
        self.get_json(&format!("/api/record/v1/{}", id), &[]).await
    }

    /// Whether `batch_date` already holds records.
    pub async fn validate_batch(&self, batch_date: &str) -> Result<bool> {
        #[derive(Deserialize)]
        struct Exists {
            exists: bool,
        }

        let body: Exists = self
            .get_json("/api/record/v1/validate", &[("batchDate", batch_date)])
            .await?;
        Ok(body.exists)
    }

    /// Upload a CSV batch for `batch_date`.
    ///
    /// When the month already has records, `confirm` decides whether they are
    /// replaced. A refusal returns [`UploadOutcome::Declined`] without sending
    /// the file. After a successful upload the listing for `filter` is fetched
    /// again.
    pub async fn upload_batch(
        &self,
        batch_date: &str,
        csv: Vec<u8>,
        filter: &RecordFilter,
        confirm: &dyn OverwriteConfirm,
    ) -> Result<UploadOutcome> {
        let overwrite = if self.validate_batch(batch_date).await? {
            if !confirm.confirm(batch_date) {
                return Ok(UploadOutcome::Declined);
            }
            true
        } else {
            false
        };

        let part = Part::bytes(csv)
            .file_name("batch.csv")
            .mime_str("text/csv")
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let mut form = Form::new()
            .part("csv", part)
            .text("batchDate", batch_date.to_string());
        if overwrite {
            form = form.text("overwrite", "true");
        }

        let response = self
            .send(self.request(reqwest::Method::POST, "/api/record/v1/upload").multipart(form))
            .await?;
        let uploaded: UploadResponse = read_json(response).await?;

        let page = self.list_records(filter).await?;
        Ok(UploadOutcome::Uploaded {
            inserted: uploaded.inserted,
            deleted: uploaded.deleted,
            page,
        })
    }

    /// Delete every record of a month. Returns how many were removed.
    pub async fn delete_batch(&self, batch_date: &str) -> Result<usize> {
        #[derive(Deserialize)]
        struct Deleted {
            deleted: usize,
        }

        let body: Deleted = self
            .send_json(
                reqwest::Method::DELETE,
                "/api/record/v1/batch/delete",
                &json!({ "date": batch_date }),
            )
            .await?;
        Ok(body.deleted)
    }

    pub async fn delete_record(&self, id: i64) -> Result<()> {
        let response = self
            .send(self.request(reqwest::Method::DELETE, &format!("/api/record/v1/{}", id)))
            .await?;
        let _: Value = read_json(response).await?;
        Ok(())
    }

    pub async fn create_record(&self, record: &NewRecord) -> Result<ContributionRecord> {
        self.send_json(reqwest::Method::POST, "/api/record/v1/s", record)
            .await
    }

    pub async fn update_sbr(&self, id: i64, update: &SbrUpdate) -> Result<ContributionRecord> {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/api/record/v1/{}/sbr", id),
            update,
        )
        .await
    }

    pub async fn signatories(&self) -> Result<Signatories> {
        self.get_json("/api/signatories/v1", &[]).await
    }

    pub async fn update_signatories(&self, signatories: &Signatories) -> Result<Signatories> {
        self.send_json(reqwest::Method::PUT, "/api/signatories/v1", signatories)
            .await
    }

    /// Render the report for the records currently shown.
    ///
    /// Refused locally when `page` holds [`PDF_ROW_LIMIT`] or more records.
    pub async fn generate_pdf(
        &self,
        page: &RecordPage,
        filter: &RecordFilter,
        options: &PdfOptions,
    ) -> Result<Vec<u8>> {
        if page.records.len() >= PDF_ROW_LIMIT {
            return Err(ClientError::TooManyRows {
                count: page.records.len(),
                limit: PDF_ROW_LIMIT,
            });
        }

        let mut query = filter.query_pairs();
        query.extend(options.query_pairs());
        let response = self
            .send(
                self.request(reqwest::Method::GET, "/api/record/v1/pdf")
                    .header("Accept", "application/pdf")
                    .query(&query),
            )
            .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.token))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .send(self.request(reqwest::Method::GET, path).query(query))
            .await?;
        read_json(response).await
    }

    async fn send_json<T: for<'de> Deserialize<'de>, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(self.request(method, path).json(body)).await?;
        read_json(response).await
    }

    /// Send and turn non-success statuses into errors.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        handle_response(response).await
    }
}

impl std::fmt::Debug for DashboardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

async fn handle_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let messages = match body.get("message") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    if messages.iter().any(|m| m == AUTH_REQUIRED_MESSAGE) {
        return Err(ClientError::AuthenticationRequired);
    }
    Err(map_status_to_error(status, messages))
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))
}
