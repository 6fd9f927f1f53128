mod dto;
pub mod faq;
pub mod handlers;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes().merge(faq::handlers::routes())
}
