use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod services;
pub mod session;

/// Routes to be nested under `/api/v1/admin`.
pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
