use axum::extract::Extension;

use crate::extractors::Json;
use crate::middleware::UserContext;
use crate::models::User;

/// Profile of the token's owner, including the permission tags the
/// dashboard uses to show or hide actions.
pub async fn profile(Extension(ctx): Extension<UserContext>) -> Json<User> {
    Json(ctx.user)
}
