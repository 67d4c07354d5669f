use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::models::{Permission, User};
use crate::util::extract_bearer_token;

/// The authenticated staff user, inserted into request extensions.
#[derive(Clone)]
pub struct UserContext {
    pub user: User,
}

impl UserContext {
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.user.has_permission(permission) {
            Ok(())
        } else {
            tracing::debug!(
                user = %self.user.email,
                %permission,
                "Permission denied"
            );
            Err(AppError::Forbidden(format!(
                "{}: {} permission required",
                msg::INSUFFICIENT_PERMISSIONS,
                permission
            )))
        }
    }
}

/// Resolve the bearer token to a user. Missing, unknown and revoked tokens
/// all produce 401.
pub async fn user_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;

    let conn = state.db.get()?;
    let user = queries::get_user_by_token(&conn, token)?.ok_or(AppError::Unauthorized)?;
    drop(conn);

    request.extensions_mut().insert(UserContext { user });

    Ok(next.run(request).await)
}
