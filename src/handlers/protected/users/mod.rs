pub mod delete;
pub mod list;
pub mod show;
pub mod update;

pub use delete::{user_delete, user_purge};
pub use list::users_list;
pub use show::user_get;
pub use update::user_put;

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Self-service or admin, else 403
pub(crate) fn ensure_can_manage(auth: &AuthUser, user_id: i64) -> Result<(), ApiError> {
    if auth.user.can_manage(user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed to manage this user"))
    }
}

pub(crate) fn positive_id(id: i64) -> Result<i64, ApiError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(ApiError::bad_request("id must be a positive integer"))
    }
}
