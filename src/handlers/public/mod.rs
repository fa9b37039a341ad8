pub mod auth;
pub mod home;

pub use auth::{login_post, register_post};
pub use home::{health, root};
