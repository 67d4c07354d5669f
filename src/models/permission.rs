use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Permission tags attached to a staff user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Permission {
    /// List, search and validate contribution records.
    View,
    /// Edit SBR details and signatories.
    Edit,
    /// Delete single records or whole batches.
    Delete,
    /// Upload CSV batches and create single records.
    Upload,
    /// Export PDF reports.
    Generate,
}

impl Permission {
    pub fn all() -> Vec<Permission> {
        Permission::iter().collect()
    }

    /// Parse a comma-separated list such as `view,edit`. Unknown tags are an error.
    pub fn parse_list(input: &str) -> Result<Vec<Permission>, String> {
        let mut out = Vec::new();
        for tag in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let permission: Permission = tag
                .parse()
                .map_err(|_| format!("unknown permission '{}'", tag))?;
            if !out.contains(&permission) {
                out.push(permission);
            }
        }
        Ok(out)
    }
}
