pub mod user;

pub use user::{User, USERS_TABLE};
