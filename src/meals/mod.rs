pub mod aggregate;
mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::crud_routes())
        .merge(handlers::report_routes())
}
