use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod policy;
pub mod repo;
pub mod repo_types;
pub mod reset_token;
pub mod services;

pub use errors::AuthError;
pub use extractors::CurrentUser;
pub use repo_types::{Role, User};
pub use services::AuthService;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
