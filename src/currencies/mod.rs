mod dto;
pub mod handlers;
pub mod rates;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

/// Reads and conversion are public; catalogue changes need an admin token.
pub fn router() -> Router<AppState> {
    handlers::routes()
}
