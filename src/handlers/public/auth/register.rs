// handlers/public/auth/register.rs - POST /api/v1/auth/register

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::hash_password;
use crate::database::models::USERS_TABLE;
use crate::database::{DatabaseError, QueryBuilder};
use crate::error::ApiError;
use crate::handlers::{email, min_len, phone, required, Validate, ValidJson};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("fullname", &self.fullname)?;
        email(&self.email)?;
        min_len("password", &self.password, 6)?;
        phone(&self.phone)
    }
}

/// POST /api/v1/auth/register - create an active, non-admin account
///
/// 409 when the email is already taken (tombstoned rows included).
pub async fn register_post(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> ApiResult<Value> {
    let email = body.email.trim().to_lowercase();

    let taken = QueryBuilder::table(USERS_TABLE)?.filter("email", email.as_str());
    state.store.not_exists_in_table(&taken).await.map_err(|e| match e {
        DatabaseError::AlreadyExists { .. } => ApiError::conflict("Email is already registered"),
        other => other.into(),
    })?;

    let password = hash_password(body.password, state.config.security.bcrypt_cost).await.map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal_server_error("An error occurred while processing your request")
    })?;

    let now = state.store.now();
    let insert = QueryBuilder::table(USERS_TABLE)?
        .set("fullname", body.fullname.trim())
        .set("email", email)
        .set("password", password)
        .set("phone", body.phone)
        .set("active", true)
        .set("is_admin", false)
        .set("created_at", now)
        .set("updated_at", now);
    let id = state.store.create(&insert).await?;

    tracing::info!(user_id = id, "user registered");
    Ok(ApiResponse::created(json!({ "id": id })).with_message("User created"))
}
