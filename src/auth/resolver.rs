use axum::http::{header, HeaderMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::TokenResolver;
use crate::database::models::{User, USERS_TABLE};
use crate::database::query_builder::{QueryBuilder, ID_COLUMN};
use crate::database::store::DataStore;

/// Cookie consulted when no Authorization header is present
pub const AUTH_COOKIE: &str = "Authorization";

/// How far a request got through authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    TokenExtracted,
    TokenResolved,
    UserLoaded,
    Authorized,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthStage::Unauthenticated => "unauthenticated",
            AuthStage::TokenExtracted => "token extracted",
            AuthStage::TokenResolved => "token resolved",
            AuthStage::UserLoaded => "user loaded",
            AuthStage::Authorized => "authorized",
        };
        f.write_str(name)
    }
}

/// Rejection, tagged with the last stage reached before it
#[derive(Debug, Error)]
#[error("rejected after '{stage}': {reason}")]
pub struct AuthError {
    pub stage: AuthStage,
    pub reason: String,
}

impl AuthError {
    fn at(stage: AuthStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// The caller of the current request. Lives in request extensions only.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

/// Bearer token → user id → active user record
pub struct AuthResolver {
    tokens: Arc<dyn TokenResolver>,
    store: DataStore,
}

impl AuthResolver {
    pub fn new(tokens: Arc<dyn TokenResolver>, store: DataStore) -> Self {
        Self { tokens, store }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let mut stage = AuthStage::Unauthenticated;

        let token = extract_token(headers).ok_or_else(|| AuthError::at(stage, "no bearer token"))?;
        stage = AuthStage::TokenExtracted;

        let subject = self
            .tokens
            .user_id(&token)
            .await
            .map_err(|e| AuthError::at(stage, e.to_string()))?;
        let user_id = parse_user_id(&subject).ok_or_else(|| AuthError::at(stage, "token subject is not a user id"))?;
        stage = AuthStage::TokenResolved;

        let query = QueryBuilder::table(USERS_TABLE)
            .map_err(|e| AuthError::at(stage, e.to_string()))?
            .filter(ID_COLUMN, user_id)
            .active_only();
        let user: User = self
            .store
            .find(&query)
            .await
            .map_err(|e| AuthError::at(stage, e.to_string()))?;
        stage = AuthStage::UserLoaded;

        if !user.active {
            return Err(AuthError::at(stage, "user is not active"));
        }
        tracing::trace!(user_id, stage = %AuthStage::Authorized, "request authenticated");

        Ok(AuthUser { user, token })
    }
}

/// Authorization header first, then the Authorization cookie. A `Bearer `
/// prefix is optional; blank tokens count as absent.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| cookie(headers, AUTH_COOKIE))?;

    let token = raw.strip_prefix("Bearer ").unwrap_or(&raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn parse_user_id(subject: &str) -> Option<i64> {
    subject.trim().parse::<i64>().ok().filter(|id| *id > 0)
}
