use serde::{Deserialize, Serialize};

use super::Permission;
use crate::error::{AppError, Result};

/// Basic email sanity check: one `@`, a non-empty local part, and a dotted domain.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AppError::BadRequest("Invalid email format".into()));
    };
    if local.is_empty()
        || local.contains(' ')
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }
    Ok(())
}

/// Staff user as returned by the profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub user_permissions: Vec<Permission>,
    pub created_at: i64,
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.user_permissions.contains(&permission)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        Ok(())
    }
}

/// API token metadata. The token itself is only ever shown once.
#[derive(Debug, Clone, Serialize)]
pub struct ApiToken {
    pub id: String,
    pub user_id: String,
    pub prefix: String,
    pub created_at: i64,
    pub last_used_at: Option<i64>,
    pub revoked_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str, name: &str) -> CreateUser {
        CreateUser {
            email: email.into(),
            name: name.into(),
            permissions: vec![],
        }
    }

    #[test]
    fn validates_email_and_name() {
        assert!(input("clerk@payroll.ph", "Clerk").validate().is_ok());
        assert!(input("clerk@payroll", "Clerk").validate().is_err());
        assert!(input("@payroll.ph", "Clerk").validate().is_err());
        assert!(input("a@b@payroll.ph", "Clerk").validate().is_err());
        assert!(input("clerk@payroll.ph", "  ").validate().is_err());
    }
}
