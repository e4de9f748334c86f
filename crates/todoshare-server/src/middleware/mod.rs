pub mod auth;

pub use auth::{AuthError, AuthState, auth_middleware};
