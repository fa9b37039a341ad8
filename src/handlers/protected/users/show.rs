// handlers/protected/users/show.rs - GET /api/v1/users/:id

use axum::extract::State;

use crate::database::models::{User, USERS_TABLE};
use crate::database::query_builder::ID_COLUMN;
use crate::database::QueryBuilder;
use crate::handlers::ValidPath;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

use super::positive_id;

/// GET /api/v1/users/:id - one active user
pub async fn user_get(State(state): State<AppState>, ValidPath(id): ValidPath<i64>) -> ApiResult<User> {
    let builder = QueryBuilder::table(USERS_TABLE)?
        .filter(ID_COLUMN, positive_id(id)?)
        .active_only();
    let user: User = state.store.find(&builder).await?;
    Ok(ApiResponse::success(user))
}
