//! # paydesk client
//!
//! Typed Rust client for the paydesk contribution records API, carrying
//! the dashboard workflow: permission-gated actions, CSV batch upload with
//! overwrite confirmation, and PDF export of the current page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paydesk_client::{DashboardClient, Permission, RecordFilter, SearchKeyword, UploadOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DashboardClient::new("http://localhost:3000", "pd_...")?;
//!
//!     let me = client.profile().await?;
//!     let filter = SearchKeyword::classify("dela cruz")?
//!         .into_filter(Some("2024-01-01".into()), Some("2024-06-01".into()));
//!     let page = client.list_records(&filter).await?;
//!     println!("{} records, total {:?}", page.count, page.total);
//!
//!     if me.user_permissions.allows(Permission::Upload) {
//!         let csv = std::fs::read("may.csv")?;
//!         let confirm = |month: &str| {
//!             println!("{} already has records, replacing", month);
//!             true
//!         };
//!         if let UploadOutcome::Uploaded { inserted, .. } =
//!             client.upload_batch("2024-05", csv, &RecordFilter::default(), &confirm).await?
//!         {
//!             println!("uploaded {} rows", inserted);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `native-tls` (default): Use native TLS for HTTPS
//! - `rustls-tls`: Use rustls for HTTPS (alternative to native-tls)

pub mod client;
pub mod display;
pub mod error;
pub mod types;

pub use client::DashboardClient;
pub use display::{
    CURRENCY_SYMBOL, SearchKeyword, coverage_label, display_amount, month_label,
    strip_currency_symbol,
};
pub use error::{AUTH_REQUIRED_MESSAGE, ClientError, Result};
pub use types::{
    ContributionRecord, NewRecord, OverwriteConfirm, PDF_ROW_LIMIT, PdfOptions, Permission,
    Permissions, RecordFilter, RecordPage, SbrUpdate, Signatories, UploadOutcome, UserProfile,
};
