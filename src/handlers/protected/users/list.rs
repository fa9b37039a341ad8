// handlers/protected/users/list.rs - GET /api/v1/users?page=&limit=

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::database::models::{User, USERS_TABLE};
use crate::database::{Page, QueryBuilder};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw strings so that junk values fall back to defaults instead of failing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> i64 {
        parse_abs(self.page.as_deref()).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        parse_abs(self.limit.as_deref())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }
}

fn parse_abs(value: Option<&str>) -> Option<i64> {
    value?.trim().parse::<i64>().ok().map(i64::saturating_abs)
}

/// GET /api/v1/users - active users, newest first, with a page cursor
pub async fn users_list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Page<User>> {
    let builder = QueryBuilder::table(USERS_TABLE)?.active_only();
    let page = state.store.paginate_page(&builder, query.page(), query.limit()).await?;
    Ok(ApiResponse::success(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(page: Option<&str>, limit: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn defaults_and_absolute_values() {
        assert_eq!(q(None, None).page(), 1);
        assert_eq!(q(None, None).limit(), DEFAULT_LIMIT);
        assert_eq!(q(Some("-3"), Some("-20")).page(), 3);
        assert_eq!(q(Some("-3"), Some("-20")).limit(), 20);
        assert_eq!(q(Some("abc"), Some("0")).page(), 1);
        assert_eq!(q(Some("abc"), Some("0")).limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(q(None, Some("5000")).limit(), MAX_LIMIT);
    }
}
