use axum::extract::{Extension, State};

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::middleware::UserContext;
use crate::models::{Permission, Signatories, UpdateSignatories};

pub async fn get_signatories(State(state): State<AppState>) -> Result<Json<Signatories>> {
    let conn = state.db.get()?;
    Ok(Json(queries::get_signatories(&conn)?))
}

/// Fields left out of the body keep their current value.
pub async fn update_signatories(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserContext>,
    Json(input): Json<UpdateSignatories>,
) -> Result<Json<Signatories>> {
    ctx.require(Permission::Edit)?;

    let conn = state.db.get()?;
    let current = queries::get_signatories(&conn)?;
    let updated = queries::save_signatories(&conn, &input.apply(&current))?;
    tracing::info!(user = %ctx.user.email, "Signatories updated");
    Ok(Json(updated))
}
