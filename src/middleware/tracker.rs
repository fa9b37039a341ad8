use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Counts the request as in flight until its response is produced. Once
/// shutdown has begun new requests are turned away with 503.
pub async fn tracker_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(_guard) = state.jobs.try_start() else {
        return ApiError::service_unavailable("Server is shutting down").into_response();
    };
    next.run(request).await
}
