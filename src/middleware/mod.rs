pub mod auth;
pub mod content_type;
pub mod deadline;
pub mod response;
pub mod signature;
pub mod tracker;

pub use auth::{auth_middleware, AuthUser};
pub use content_type::content_type_middleware;
pub use deadline::deadline_middleware;
pub use response::{ApiResponse, ApiResult};
pub use signature::signature_middleware;
pub use tracker::tracker_middleware;
