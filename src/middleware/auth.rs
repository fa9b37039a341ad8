use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

pub use crate::auth::AuthUser;

/// Resolves the bearer token to an active user and stores it as [`AuthUser`]
/// in the request extensions; anything else is a 401 before the handler runs.
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.auth.authenticate(request.headers()).await {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
