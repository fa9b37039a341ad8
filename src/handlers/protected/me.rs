// handlers/protected/me.rs - GET /api/v1/me

use axum::Extension;

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/v1/me - the caller's own record
pub async fn me_get(Extension(auth): Extension<AuthUser>) -> ApiResult<User> {
    Ok(ApiResponse::success(auth.user))
}
