mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

use common::TestApp;

/// Binds the router on an ephemeral port and talks to it over real HTTP
async fn spawn(app: &TestApp) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = app.router.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let app = TestApp::new();
    let base_url = spawn(&app).await?;

    let res = reqwest::get(format!("{}/", base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Starter Kit API");
    Ok(())
}

#[tokio::test]
async fn signed_headers_work_over_the_wire() -> Result<()> {
    let app = TestApp::new();
    let base_url = spawn(&app).await?;
    let (timestamp, hash) = app.state.signer.headers_for("/api/v1/me");

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/api/v1/me", base_url))
        .header("Timestamp", timestamp)
        .header("Hash", hash)
        .send()
        .await?;

    // Signature passes, bearer auth does not
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["message"], "Unauthorized");
    Ok(())
}
