mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

/// Supplier management; every route requires an admin token.
pub fn router() -> Router<AppState> {
    handlers::routes()
}
