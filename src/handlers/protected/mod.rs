pub mod me;
pub mod users;

pub use me::me_get;
pub use users::{user_delete, user_get, user_purge, user_put, users_list};
