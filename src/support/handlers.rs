use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    category_or_default, AddMessageRequest, AdminTicketsQuery, CreateTicketRequest,
    ListTicketsQuery, TicketDetail, TicketPage, UpdateTicketRequest,
};
use super::repo::{self, Ticket, TicketChanges, TicketFilter, TicketMessage, TicketStatus};
use super::services::{self, TicketStats};
use crate::{
    auth::{repo::User, AdminUser, AuthUser},
    error::{AppError, AppResult},
    params::{like_pattern, PageRequest},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/support/tickets", get(my_tickets).post(create_ticket))
        .route("/support/tickets/:id", get(get_ticket).put(update_ticket))
        .route("/support/tickets/:id/messages", post(add_message))
        .route("/admin/support/tickets", get(admin_tickets))
        .route("/admin/support/stats", get(ticket_stats))
}

/// Owners and admins see a ticket; everyone else gets a 404.
async fn visible_ticket(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Ticket> {
    repo::find(&state.db, id)
        .await?
        .filter(|t| t.user_id == user.id || user.is_admin())
        .ok_or_else(|| AppError::not_found("Ticket not found"))
}

#[instrument(skip(state, payload))]
pub async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<TicketDetail>)> {
    let new = payload.validate()?;
    let ticket = repo::create(&state.db, user.id, &new).await?;
    let messages = repo::messages(&state.db, ticket.id).await?;
    info!(ticket_id = %ticket.id, user_id = %user.id, "support ticket opened");
    Ok((StatusCode::CREATED, Json(TicketDetail { ticket, messages })))
}

#[instrument(skip(state))]
pub async fn my_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<ListTicketsQuery>,
) -> AppResult<Json<TicketPage>> {
    let page = PageRequest::new(q.page, q.per_page);
    let filter = TicketFilter {
        user_id: Some(user.id),
        status: q.status,
        ..Default::default()
    };
    let (tickets, total) = repo::list(&state.db, &filter, page.per_page, page.offset()).await?;
    Ok(Json(TicketPage::new(tickets, total, page)))
}

#[instrument(skip(state))]
pub async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TicketDetail>> {
    let ticket = visible_ticket(&state, &user, id).await?;
    let messages = repo::messages(&state.db, id).await?;
    Ok(Json(TicketDetail { ticket, messages }))
}

#[instrument(skip(state, payload))]
pub async fn add_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMessageRequest>,
) -> AppResult<(StatusCode, Json<TicketMessage>)> {
    let body = payload.message.trim();
    if body.is_empty() {
        return Err(AppError::bad_request("message is required"));
    }
    let ticket = visible_ticket(&state, &user, id).await?;
    if ticket.status == TicketStatus::Closed {
        return Err(AppError::bad_request("Ticket is closed"));
    }
    let message = repo::add_message(&state.db, id, user.id, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state, payload))]
pub async fn update_ticket(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketRequest>,
) -> AppResult<Json<Ticket>> {
    let current = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Ticket not found"))?;

    if let Some(Some(assignee)) = payload.assigned_to {
        if User::find_by_id(&state.db, assignee).await?.is_none() {
            return Err(AppError::bad_request("Assignee does not exist"));
        }
    }

    let status = payload.status.unwrap_or(current.status);
    let changes = TicketChanges {
        status,
        priority: payload.priority.unwrap_or(current.priority),
        category: match &payload.category {
            Some(c) => category_or_default(Some(c.clone())),
            None => current.category.clone(),
        },
        assigned_to: payload.assignee(current.assigned_to),
        resolved_at: services::resolved_at(status, current.resolved_at, OffsetDateTime::now_utc()),
    };

    let ticket = repo::update(&state.db, id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Ticket not found"))?;
    info!(ticket_id = %id, by = %admin_id, status = ?ticket.status, "support ticket updated");
    Ok(Json(ticket))
}

#[instrument(skip(state))]
pub async fn admin_tickets(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<AdminTicketsQuery>,
) -> AppResult<Json<TicketPage>> {
    let page = PageRequest::new(q.page, q.per_page);
    let filter = TicketFilter {
        user_id: None,
        status: q.status,
        assigned_to: q.assigned_to,
        search: q
            .q
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern),
    };
    let (tickets, total) = repo::list(&state.db, &filter, page.per_page, page.offset()).await?;
    Ok(Json(TicketPage::new(tickets, total, page)))
}

#[instrument(skip(state))]
pub async fn ticket_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<TicketStats>> {
    let counts = repo::count_by_status(&state.db).await?;
    Ok(Json(TicketStats::from_counts(&counts)))
}
