// handlers/protected/users/update.rs - PUT /api/v1/users/:id

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::USERS_TABLE;
use crate::database::query_builder::ID_COLUMN;
use crate::database::QueryBuilder;
use crate::error::ApiError;
use crate::handlers::{phone, required, Validate, ValidJson, ValidPath};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::{ensure_can_manage, positive_id};

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub fullname: Option<String>,
    pub phone: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.fullname.is_none() && self.phone.is_none() {
            return Err(ApiError::bad_request("Nothing to update"));
        }
        if let Some(fullname) = &self.fullname {
            required("fullname", fullname)?;
        }
        if let Some(value) = &self.phone {
            phone(value)?;
        }
        Ok(())
    }
}

/// PUT /api/v1/users/:id - change name and/or phone (self or admin)
pub async fn user_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(body): ValidJson<UpdateUserRequest>,
) -> ApiResult<Value> {
    let id = positive_id(id)?;
    ensure_can_manage(&auth, id)?;

    let mut builder = QueryBuilder::table(USERS_TABLE)?;
    if let Some(fullname) = body.fullname {
        builder = builder.set("fullname", fullname.trim());
    }
    if let Some(phone) = body.phone {
        builder = builder.set("phone", phone);
    }
    let builder = builder
        .set("updated_at", state.store.now())
        .filter(ID_COLUMN, id)
        .active_only();

    state.store.update(&builder).await?;
    Ok(ApiResponse::success(json!({ "id": id })).with_message("User updated"))
}
