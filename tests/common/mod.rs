#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use starter_kit::clock::ManualClock;
use starter_kit::config::{AppConfig, Environment};
use starter_kit::database::{DataStore, DatabaseError, Executor, PreparedQuery, ResultRow, SqlValue};
use starter_kit::{app, AppState};

pub const APP_SECRET: &str = "integration-secret";
pub const JWT_SECRET: &str = "integration-jwt-secret";

pub enum Reply {
    Affected(u64),
    Rows(Vec<ResultRow>),
}

/// Executor that answers from a queue and records every statement it sees
#[derive(Default)]
pub struct MockExecutor {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<PreparedQuery>>,
    delay: Mutex<Option<Duration>>,
}

impl MockExecutor {
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn delay_each(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<PreparedQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn next(&self, query: &PreparedQuery) -> Reply {
        self.calls.lock().unwrap().push(query.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Rows(Vec::new()))
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, query: &PreparedQuery) -> Result<u64, DatabaseError> {
        match self.next(query).await {
            Reply::Affected(n) => Ok(n),
            Reply::Rows(rows) => Ok(rows.len() as u64),
        }
    }

    async fn fetch_all(&self, query: &PreparedQuery) -> Result<Vec<ResultRow>, DatabaseError> {
        match self.next(query).await {
            Reply::Rows(rows) => Ok(rows),
            Reply::Affected(_) => Ok(Vec::new()),
        }
    }

    async fn fetch_optional(&self, query: &PreparedQuery) -> Result<Option<ResultRow>, DatabaseError> {
        self.fetch_all(query).await.map(|rows| rows.into_iter().next())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub fn row(columns: &[&str], values: Vec<SqlValue>) -> ResultRow {
    ResultRow::new(columns.iter().map(|c| c.to_string()).collect(), values)
}

pub fn user_row(id: i64, is_admin: bool, active: bool) -> ResultRow {
    user_row_with_password(id, is_admin, active, "$2b$04$not-a-real-hash")
}

pub fn user_row_with_password(id: i64, is_admin: bool, active: bool, password: &str) -> ResultRow {
    row(
        &["id", "fullname", "email", "password", "phone", "active", "is_admin", "last_login", "deleted_at"],
        vec![
            SqlValue::Int(id),
            SqlValue::Text(format!("User {}", id)),
            SqlValue::Text(format!("user{}@example.com", id)),
            SqlValue::Text(password.to_string()),
            SqlValue::Text("+905551112233".into()),
            SqlValue::Bool(active),
            SqlValue::Bool(is_admin),
            SqlValue::Null,
            SqlValue::Null,
        ],
    )
}

pub fn count_row(n: i64) -> ResultRow {
    row(&["count"], vec![SqlValue::Int(n)])
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::for_environment(Environment::Development);
    config.security.app_secret = APP_SECRET.to_string();
    config.security.jwt_secret = JWT_SECRET.to_string();
    config.security.bcrypt_cost = 4;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub executor: Arc<MockExecutor>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let executor = Arc::new(MockExecutor::default());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()));
        let store = DataStore::new(executor.clone(), clock.clone());
        let state = AppState::new(config, store, clock.clone());

        Self {
            router: app(state.clone()),
            state,
            executor,
            clock,
        }
    }

    /// Request builder carrying a valid signature for `uri` at the test clock's time
    pub fn signed(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        let path = uri.split('?').next().unwrap_or(uri);
        let (timestamp, hash) = self.state.signer.headers_for(path);
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Timestamp", timestamp)
            .header("Hash", hash)
    }

    pub fn bearer(&self, user_id: i64) -> String {
        format!("Bearer {}", self.state.tokens.issue(user_id).unwrap())
    }

    pub fn json_body(builder: axum::http::request::Builder, body: Value) -> Request<Body> {
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }
}
