//! Type definitions for the paydesk client

use serde::{Deserialize, Serialize};

use crate::display::strip_currency_symbol;

/// Records a page may hold before PDF export is refused.
pub const PDF_ROW_LIMIT: usize = 100;

/// Action a staff user may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    View,
    Edit,
    Delete,
    Upload,
    Generate,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Upload => "upload",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// Granted permissions. Unknown names sent by a newer server are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permissions(Vec<Permission>);

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
        ))
    }
}

impl Permissions {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self(granted.into_iter().collect())
    }

    /// Whether the dashboard should offer the action gated by `permission`.
    pub fn allows(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

/// Signed-in staff user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub user_permissions: Permissions,
}

/// One contribution line. Amounts are kept as the decimal strings the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub id: i64,
    #[serde(rename = "batchDate")]
    pub batch_date: String,
    pub sss_no: String,
    pub name: String,
    pub ss: String,
    pub ec: String,
    pub total: String,
    #[serde(default)]
    pub sbr_no: Option<String>,
    #[serde(default)]
    pub sbr_date: Option<String>,
}

/// List filter. Empty fields are left off the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub sss_no: Option<String>,
    pub name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RecordFilter {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("sssNo", &self.sss_no),
            ("name", &self.name),
            ("from", &self.from),
            ("to", &self.to),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }
}

/// A filtered listing with the totals the server computed over it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<ContributionRecord>,
    /// From the `nodex-generated-count` header; falls back to `records.len()`.
    pub count: usize,
    /// From the `nodex-generated-total` header.
    pub total: Option<String>,
}

/// Body for entering a single record by hand.
#[derive(Debug, Clone, Serialize)]
pub struct NewRecord {
    #[serde(rename = "batchDate")]
    pub batch_date: String,
    pub sss_no: String,
    pub name: String,
    pub ss: String,
    pub ec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbr_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbr_date: Option<String>,
}

/// SBR edit form.
///
/// Unset fields are left out of the request and keep their stored value.
/// An empty `sbr_no` or `sbr_date` clears it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SbrUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbr_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbr_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sss_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
}

impl SbrUpdate {
    /// Form contents for a record as the dashboard shows it.
    ///
    /// Amounts drop their currency prefix so the server gets the raw
    /// values back. A missing SBR is sent as empty, which keeps it unset.
    pub fn from_edit_form(shown: &ContributionRecord) -> Self {
        let amount = |value: &str| Some(strip_currency_symbol(value).to_string());
        Self {
            sbr_no: Some(shown.sbr_no.clone().unwrap_or_default()),
            sbr_date: Some(shown.sbr_date.clone().unwrap_or_default()),
            sss_no: Some(shown.sss_no.clone()),
            name: Some(shown.name.clone()),
            ss: amount(&shown.ss),
            ec: amount(&shown.ec),
            total: amount(&shown.total),
        }
    }
}

/// Header overrides printed on the PDF report.
#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    pub display_name: Option<String>,
    pub display_sss_no: Option<String>,
    pub display_coverage: Option<String>,
}

impl PdfOptions {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("displayName", &self.display_name),
            ("displaySSSNo", &self.display_sss_no),
            ("displayCoverage", &self.display_coverage),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

/// Result of the upload workflow.
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    /// The month already had records and the user kept them.
    Declined,
    /// The batch was stored; `page` is the refreshed listing.
    Uploaded {
        inserted: usize,
        deleted: usize,
        page: RecordPage,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UploadResponse {
    pub inserted: usize,
    #[serde(default)]
    pub deleted: usize,
}

/// Asks the user whether an existing month may be overwritten.
pub trait OverwriteConfirm {
    fn confirm(&self, batch_date: &str) -> bool;
}

impl<F> OverwriteConfirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, batch_date: &str) -> bool {
        self(batch_date)
    }
}

/// Names printed in the report's signature block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatories {
    pub payroll_incharge: String,
    pub vp_finance: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_skip_unknown_names() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "a@b.test",
            "name": "A",
            "user_permissions": ["view", "approve", "generate"],
            "created_at": 0
        }))
        .unwrap();
        assert!(profile.user_permissions.allows(Permission::View));
        assert!(profile.user_permissions.allows(Permission::Generate));
        assert!(!profile.user_permissions.allows(Permission::Delete));
        assert_eq!(profile.user_permissions.iter().count(), 2);
    }

    #[test]
    fn filter_skips_blank_fields() {
        let filter = RecordFilter {
            sss_no: Some(" ".into()),
            name: Some("Ana".into()),
            from: None,
            to: Some("2024-06-01".into()),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("name", "Ana"), ("to", "2024-06-01")]
        );
    }
}
