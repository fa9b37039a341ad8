// handlers/public/auth/login.rs - POST /api/v1/auth/login

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::auth::verify_password;
use crate::database::models::{User, USERS_TABLE};
use crate::database::query_builder::ID_COLUMN;
use crate::database::{DatabaseError, QueryBuilder};
use crate::error::ApiError;
use crate::handlers::{email, min_len, Validate, ValidJson};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        email(&self.email)?;
        min_len("password", &self.password, 6)
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: User,
}

/// POST /api/v1/auth/login - exchange credentials for a bearer token
///
/// Unknown email, inactive account and wrong password all answer the same 401.
pub async fn login_post(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let lookup = QueryBuilder::table(USERS_TABLE)?
        .filter("email", body.email.trim().to_lowercase())
        .active_only();
    let mut user: User = match state.store.find(&lookup).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound { .. }) => return Err(ApiError::unauthorized()),
        Err(e) => return Err(e.into()),
    };

    let matched = verify_password(body.password, user.password.clone())
        .await
        .map_err(|e| {
            tracing::error!("password verification failed: {}", e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?;
    if !matched || !user.active {
        tracing::debug!(user_id = user.id, "login rejected");
        return Err(ApiError::unauthorized());
    }

    let now = state.store.now();
    let stamp = QueryBuilder::table(USERS_TABLE)?
        .set("last_login", now)
        .filter(ID_COLUMN, user.id)
        .active_only();
    state.store.update(&stamp).await?;
    user.last_login = Some(now);

    let token = state.tokens.issue(user.id).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_in: state.tokens.expires_in_secs(),
        user,
    }))
}
