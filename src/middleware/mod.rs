//! Request middleware

pub mod auth;

pub use auth::{auth_middleware, service_auth_middleware, AuthUser, CurrentUser};
