use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;

use crate::error::ApiError;
use crate::state::AppState;

/// Runs the rest of the stack under the configured request deadline. On expiry
/// the handler future is dropped, which also cancels any statement it was awaiting.
pub async fn deadline_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let limit = Duration::from_secs(state.config.server.request_timeout_secs);
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(timeout_secs = limit.as_secs(), "request deadline exceeded");
            ApiError::internal_server_error("Request processing timed out").into_response()
        }
    }
}
