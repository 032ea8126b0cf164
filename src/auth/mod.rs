use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
mod services;

pub use jwt::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::account_routes())
}
