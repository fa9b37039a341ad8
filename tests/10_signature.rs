mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Duration;

use common::TestApp;

#[tokio::test]
async fn health_is_exempt_from_signing() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .send(Request::get("/health").body(Body::empty())?)
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn unsigned_request_is_rejected_without_touching_the_store() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .send(Request::get("/api/v1/users").body(Body::empty())?)
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid request");
    assert_eq!(app.executor.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn signature_older_than_the_window_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let request = app.signed(Method::GET, "/api/v1/me").body(Body::empty())?;
    app.clock.advance(Duration::seconds(61));

    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid request");
    Ok(())
}

#[tokio::test]
async fn tampered_hash_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let (timestamp, hash) = app.state.signer.headers_for("/api/v1/me");
    let mut bytes = hash.into_bytes();
    bytes[0] ^= 0x01;
    let tampered = String::from_utf8(bytes)?;

    let request = Request::get("/api/v1/me")
        .header("Timestamp", timestamp)
        .header("Hash", tampered)
        .body(Body::empty())?;
    let (status, _) = app.send(request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn signature_for_another_path_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let (timestamp, hash) = app.state.signer.headers_for("/api/v1/users");
    let request = Request::get("/api/v1/me")
        .header("Timestamp", timestamp)
        .header("Hash", hash)
        .body(Body::empty())?;

    let (status, _) = app.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn signed_request_without_token_never_reaches_the_store() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .send(app.signed(Method::GET, "/api/v1/me").body(Body::empty())?)
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");
    assert_eq!(app.executor.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_route_renders_the_error_envelope() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .send(app.signed(Method::GET, "/nope").body(Body::empty())?)
        .await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn cors_preflight_lists_signing_headers() -> Result<()> {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/users")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "timestamp,hash")
        .body(Body::empty())?;

    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    let allowed = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()?
        .to_lowercase();
    assert!(allowed.contains("timestamp") && allowed.contains("hash"));
    Ok(())
}
