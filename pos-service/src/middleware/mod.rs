pub mod auth;
pub mod principal;

pub use auth::{auth_middleware, AuthUser};
pub use principal::principal_middleware;
