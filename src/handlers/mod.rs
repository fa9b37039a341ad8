// handlers/mod.rs - two security tiers
//
// Public (signature only) → Protected (signature + bearer auth)
pub mod public;
pub mod protected;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Request bodies check their own field rules after decoding
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// `Json<T>` that answers decode failures with the standard error envelope
/// and runs [`Validate`] before the handler sees the value
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// `Path<T>` whose parse failures render the standard error envelope
pub struct ValidPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ValidPath(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Non-empty after trimming
pub(crate) fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

pub(crate) fn min_len(field: &str, value: &str, min: usize) -> Result<(), ApiError> {
    if value.chars().count() < min {
        return Err(ApiError::bad_request(format!("{} must be at least {} characters", field, min)));
    }
    Ok(())
}

/// local@domain.tld, no whitespace
pub(crate) fn email(value: &str) -> Result<(), ApiError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !value.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("email must be a valid email address"));
    }
    Ok(())
}

/// E.164: `+`, a non-zero digit, at most 15 digits in total
pub(crate) fn phone(value: &str) -> Result<(), ApiError> {
    let valid = match value.strip_prefix('+') {
        Some(digits) => {
            (1..=15).contains(&digits.len())
                && digits.chars().all(|c| c.is_ascii_digit())
                && !digits.starts_with('0')
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("phone must be in E.164 format"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(email("ada@example.com").is_ok());
        assert!(email("ada@example").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("ada@@example.com").is_err());
        assert!(email("a da@example.com").is_err());
    }

    #[test]
    fn phone_rules() {
        assert!(phone("+905551112233").is_ok());
        assert!(phone("905551112233").is_err());
        assert!(phone("+0555").is_err());
        assert!(phone("+1234567890123456").is_err());
        assert!(phone("+1-555").is_err());
    }

    #[test]
    fn length_rules() {
        assert!(min_len("password", "12345", 6).is_err());
        assert!(min_len("password", "123456", 6).is_ok());
        assert!(required("fullname", "  ").is_err());
    }
}
