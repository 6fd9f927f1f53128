use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateFaqRequest, ListFaqsQuery, SearchFaqsQuery, UpdateFaqRequest, VoteRequest};
use super::repo::{self, Faq};
use crate::{
    auth::AdminUser,
    error::{AppError, AppResult},
    params::like_pattern,
    state::AppState,
};

/// Public help pages plus admin CRUD under `/admin/faqs`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/faqs", get(list_faqs))
        .route("/faqs/search", get(search_faqs))
        .route("/faqs/:id", get(get_faq))
        .route("/faqs/:id/vote", post(vote_faq))
        .route("/admin/faqs", get(admin_faqs).post(create_faq))
        .route(
            "/admin/faqs/:id",
            get(admin_get_faq).put(update_faq).delete(delete_faq),
        )
}

fn not_found() -> AppError {
    AppError::not_found("FAQ not found")
}

#[instrument(skip(state))]
pub async fn list_faqs(
    State(state): State<AppState>,
    Query(q): Query<ListFaqsQuery>,
) -> AppResult<Json<Vec<Faq>>> {
    Ok(Json(repo::list(&state.db, q.category, true).await?))
}

#[instrument(skip(state))]
pub async fn search_faqs(
    State(state): State<AppState>,
    Query(q): Query<SearchFaqsQuery>,
) -> AppResult<Json<Vec<Faq>>> {
    let term = q.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AppError::bad_request("q is required"));
    }
    Ok(Json(repo::search(&state.db, &like_pattern(term)).await?))
}

#[instrument(skip(state))]
pub async fn get_faq(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Faq>> {
    repo::view(&state.db, id).await?.map(Json).ok_or_else(not_found)
}

#[instrument(skip(state))]
pub async fn vote_faq(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> AppResult<Json<Faq>> {
    repo::vote(&state.db, id, payload.helpful)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state))]
pub async fn admin_faqs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<ListFaqsQuery>,
) -> AppResult<Json<Vec<Faq>>> {
    Ok(Json(repo::list(&state.db, q.category, false).await?))
}

#[instrument(skip(state))]
pub async fn admin_get_faq(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Faq>> {
    repo::find(&state.db, id).await?.map(Json).ok_or_else(not_found)
}

#[instrument(skip(state, payload))]
pub async fn create_faq(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<CreateFaqRequest>,
) -> AppResult<(StatusCode, Json<Faq>)> {
    let fields = payload.into_fields()?;
    let faq = repo::insert(&state.db, &fields).await?;
    info!(faq_id = %faq.id, by = %admin_id, "faq created");
    Ok((StatusCode::CREATED, Json(faq)))
}

#[instrument(skip(state, payload))]
pub async fn update_faq(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFaqRequest>,
) -> AppResult<Json<Faq>> {
    let current = repo::find(&state.db, id).await?.ok_or_else(not_found)?;
    let fields = payload.apply(current)?;
    let faq = repo::update(&state.db, id, &fields).await?.ok_or_else(not_found)?;
    info!(faq_id = %id, by = %admin_id, "faq updated");
    Ok(Json(faq))
}

#[instrument(skip(state))]
pub async fn delete_faq(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !repo::delete(&state.db, id).await? {
        return Err(not_found());
    }
    info!(faq_id = %id, by = %admin_id, "faq deleted");
    Ok(StatusCode::NO_CONTENT)
}
