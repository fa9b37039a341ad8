use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use crate::auth::signature::{SignatureError, HASH_HEADER, TIMESTAMP_HEADER};
use crate::error::ApiError;
use crate::state::AppState;

/// Rejects requests whose `Timestamp`/`Hash` pair does not verify, unless the
/// path is on the skip list. A panic while verifying is answered with the same
/// 401 as any other failure.
pub async fn signature_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if state.signer.is_exempt(&path) {
        return next.run(request).await;
    }

    let verdict = {
        let headers = request.headers();
        let signer = &state.signer;
        guarded(|| signer.verify(header(headers, TIMESTAMP_HEADER), header(headers, HASH_HEADER), &path)).await
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Runs a verification, turning both failures and panics into the generic 401
async fn guarded<F>(verify: F) -> Result<(), ApiError>
where
    F: FnOnce() -> Result<(), SignatureError>,
{
    match AssertUnwindSafe(async move { verify() }).catch_unwind().await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            tracing::error!("panic while verifying request signature");
            Err(ApiError::invalid_signature())
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
