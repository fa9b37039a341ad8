// handlers/protected/users/delete.rs - DELETE /api/v1/users/:id[/purge]

use axum::extract::State;
use axum::Extension;
use serde_json::{json, Value};

use crate::database::models::USERS_TABLE;
use crate::error::ApiError;
use crate::handlers::ValidPath;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::{ensure_can_manage, positive_id};

/// DELETE /api/v1/users/:id - tombstone (self or admin)
pub async fn user_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Value> {
    let id = positive_id(id)?;
    ensure_can_manage(&auth, id)?;

    state.store.soft_delete(USERS_TABLE, id).await?;
    tracing::info!(user_id = id, by = auth.user.id, "user soft deleted");
    Ok(ApiResponse::success(json!({ "id": id })).with_message("User deleted"))
}

/// DELETE /api/v1/users/:id/purge - remove the row for good (admin only)
pub async fn user_purge(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Value> {
    let id = positive_id(id)?;
    if !auth.user.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    state.store.hard_delete(USERS_TABLE, id).await?;
    tracing::info!(user_id = id, by = auth.user.id, "user purged");
    Ok(ApiResponse::success(json!({ "id": id })).with_message("User purged"))
}
