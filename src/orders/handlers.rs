use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AdminOrdersQuery, CheckoutRequest, OrderView, UpdateStatusRequest};
use super::repo::{self, Order, OrderStatus};
use super::services;
use crate::{
    auth::{repo::User, AdminUser, AuthUser},
    error::{AppError, AppResult},
    notifications::{repo::NewNotification, services as notify},
    params::{Paged, Pagination},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(checkout))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/status", put(update_status))
        .route("/admin/orders", get(admin_list_orders))
}

async fn with_items(state: &AppState, orders: Vec<Order>) -> AppResult<Vec<OrderView>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items = repo::items_for(&state.db, &ids).await?;
    Ok(orders
        .into_iter()
        .map(|order| OrderView {
            items: items.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

async fn view(state: &AppState, order: Order) -> AppResult<OrderView> {
    let mut views = with_items(state, vec![order]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order view lost")))
}

/// Records the notification and emails the order's owner.
async fn tell_customer(state: &AppState, user_id: Uuid, note: NewNotification) {
    let email = match User::find_by_id(&state.db, user_id).await {
        Ok(user) => user.map(|u| u.email),
        Err(e) => {
            warn!(error = %e, %user_id, "could not load customer email");
            None
        }
    };
    notify::deliver(state, note, email).await;
}

#[instrument(skip(state, payload))]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<OrderView>)> {
    let address = payload.shipping_address.normalized()?;

    let mut tx = state.db.begin().await?;
    let lines = repo::lock_cart_lines_tx(&mut tx, user.id).await?;
    let total = services::checkout_total(&lines)?;
    let order = repo::insert_order_tx(&mut tx, user.id, total, &address).await?;
    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        items.push(repo::insert_item_tx(&mut tx, order.id, line).await?);
    }
    repo::clear_cart_tx(&mut tx, user.id, &services::ordered_products(&lines)).await?;
    tx.commit().await?;

    info!(order_id = %order.id, user_id = %user.id, %total, lines = items.len(), "order placed");

    let note = notify::order_placed(user.id, order.id, &total.to_string());
    tell_customer(&state, user.id, note).await;

    Ok((StatusCode::CREATED, Json(OrderView { order, items })))
}

#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<OrderView>>> {
    let orders = repo::list_for_user(&state.db, user.id).await?;
    Ok(Json(with_items(&state, orders).await?))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderView>> {
    let order = repo::find(&state.db, id)
        .await?
        .filter(|o| o.user_id == user.id || user.is_admin())
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    Ok(Json(view(&state, order).await?))
}

#[instrument(skip(state))]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderView>> {
    let mut tx = state.db.begin().await?;
    let current = repo::lock_order_tx(&mut tx, id)
        .await?
        .filter(|o| o.user_id == user.id)
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    services::ensure_transition(current.status, OrderStatus::Cancelled)?;
    let restored = repo::restore_stock_tx(&mut tx, id).await?;
    let order = repo::set_status_tx(&mut tx, id, OrderStatus::Cancelled, None).await?;
    tx.commit().await?;

    info!(order_id = %id, user_id = %user.id, restored, "order cancelled by customer");

    let note = notify::order_status_changed(user.id, id, OrderStatus::Cancelled.as_str(), None);
    tell_customer(&state, user.id, note).await;

    Ok(Json(view(&state, order).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<OrderView>> {
    let tracking = payload
        .tracking_number
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let mut tx = state.db.begin().await?;
    let current = repo::lock_order_tx(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    services::ensure_transition(current.status, payload.status)?;
    if payload.status == OrderStatus::Cancelled {
        repo::restore_stock_tx(&mut tx, id).await?;
    }
    let order = repo::set_status_tx(&mut tx, id, payload.status, tracking).await?;
    tx.commit().await?;

    info!(
        order_id = %id,
        by = %admin_id,
        from = current.status.as_str(),
        to = payload.status.as_str(),
        "order status changed"
    );

    let note = notify::order_status_changed(
        order.user_id,
        id,
        payload.status.as_str(),
        order.tracking_number.as_deref(),
    );
    tell_customer(&state, order.user_id, note).await;

    Ok(Json(view(&state, order).await?))
}

#[instrument(skip(state))]
pub async fn admin_list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<AdminOrdersQuery>,
) -> AppResult<Json<Paged<OrderView>>> {
    let page = Pagination::from_query(q.limit, q.offset);
    let (orders, total) = repo::list_all(&state.db, q.status, page.limit, page.offset).await?;
    Ok(Json(Paged {
        items: with_items(&state, orders).await?,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}
