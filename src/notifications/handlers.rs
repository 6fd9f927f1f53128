use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::repo::{self, Notification, NotificationStatus};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    params::{Paged, Pagination},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
        .route("/notifications/:id/archive", post(archive))
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub status: Option<NotificationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub updated: u64,
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<ListNotificationsQuery>,
) -> AppResult<Json<Paged<Notification>>> {
    let page = Pagination::from_query(q.limit, q.offset);
    let (items, total) = repo::list(&state.db, user.id, q.status, page.limit, page.offset).await?;
    Ok(Json(Paged {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[instrument(skip(state))]
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UnreadCount>> {
    let count = repo::unread_count(&state.db, user.id).await?;
    Ok(Json(UnreadCount { count }))
}

async fn set_status(
    state: &AppState,
    user: AuthUser,
    id: Uuid,
    status: NotificationStatus,
) -> AppResult<Json<Notification>> {
    repo::set_status(&state.db, user.id, id, status)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Notification not found"))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    set_status(&state, user, id, NotificationStatus::Read).await
}

#[instrument(skip(state))]
pub async fn archive(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    set_status(&state, user, id, NotificationStatus::Archived).await
}

#[instrument(skip(state))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Updated>> {
    let updated = repo::mark_all_read(&state.db, user.id).await?;
    debug!(user_id = %user.id, updated, "notifications marked read");
    Ok(Json(Updated { updated }))
}
