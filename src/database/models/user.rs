use chrono::{DateTime, Utc};
use serde::Serialize;

pub const USERS_TABLE: &str = "users";

/// Row of the `users` table. The password hash is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub phone: String,
    pub active: bool,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

crate::record!(User {
    id,
    fullname,
    email,
    password,
    phone,
    active,
    is_admin,
    last_login,
    created_at,
    updated_at,
    deleted_at,
});

impl User {
    /// Admins may act on any account; everyone else only on their own
    pub fn can_manage(&self, user_id: i64) -> bool {
        self.is_admin || self.id == user_id
    }
}
