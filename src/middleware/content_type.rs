use axum::{
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Bodies of POST/PUT/PATCH requests must be declared as JSON
pub async fn content_type_middleware(request: Request, next: Next) -> Response {
    let needs_body = matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH);
    if needs_body && !is_json(request.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())) {
        return ApiError::bad_request("Invalid Content-Type").into_response();
    }
    next.run(request).await
}

/// `application/json`, ignoring case and any `; charset=...` parameters
fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|v| v.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
