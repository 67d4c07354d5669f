use serde::{Deserialize, Serialize};

/// Names printed in the signature block of generated reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatories {
    pub payroll_incharge: String,
    pub vp_finance: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSignatories {
    pub payroll_incharge: Option<String>,
    pub vp_finance: Option<String>,
}

impl UpdateSignatories {
    pub fn apply(&self, current: &Signatories) -> Signatories {
        Signatories {
            payroll_incharge: self
                .payroll_incharge
                .as_deref()
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| current.payroll_incharge.clone()),
            vp_finance: self
                .vp_finance
                .as_deref()
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| current.vp_finance.clone()),
        }
    }
}
