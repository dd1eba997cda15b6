pub mod auth;
pub mod validate_identity;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use validate_identity::validate_identity_middleware;
