use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod revocation;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
