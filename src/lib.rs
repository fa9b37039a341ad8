pub mod auth;
pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod server;
pub mod state;
pub mod types;

pub use server::{app, serve};
pub use state::AppState;
