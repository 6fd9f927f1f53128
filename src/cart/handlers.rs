use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{AddItemRequest, CartView, UpdateItemRequest};
use super::{repo, services};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", put(update_item).delete(remove_item))
}

async fn load_view(state: &AppState, cart_id: Option<Uuid>) -> AppResult<CartView> {
    let lines = match cart_id {
        Some(id) => repo::lines(&state.db, id).await?,
        None => Vec::new(),
    };
    Ok(services::price_cart(cart_id, lines))
}

async fn cart_of(state: &AppState, user: &AuthUser) -> AppResult<Uuid> {
    repo::find_cart_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart item not found"))
}

#[instrument(skip(state))]
pub async fn get_cart(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<CartView>> {
    let cart_id = repo::find_cart_id(&state.db, user.id).await?;
    Ok(Json(load_view(&state, cart_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<CartView>> {
    services::validate_quantity(payload.quantity)?;
    let product_id = payload.product_id;

    let mut tx = state.db.begin().await?;
    let stock = repo::product_stock_tx(&mut tx, product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    let cart_id = repo::ensure_cart_tx(&mut tx, user.id).await?;
    let existing = repo::line_quantity_tx(&mut tx, cart_id, product_id).await?;
    services::merge_quantity(existing, payload.quantity, stock)?;
    let merged = repo::add_item_tx(&mut tx, cart_id, product_id, payload.quantity).await?;
    // a concurrent first insert can still push the line past stock; dropping
    // the transaction rolls the upsert back
    services::ensure_in_stock(merged, stock)?;
    tx.commit().await?;

    info!(user_id = %user.id, %product_id, quantity = merged, "cart item added");
    Ok(Json(load_view(&state, Some(cart_id)).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> AppResult<Json<CartView>> {
    services::validate_quantity(payload.quantity)?;
    let cart_id = cart_of(&state, &user).await?;

    let mut tx = state.db.begin().await?;
    let stock = repo::line_stock_tx(&mut tx, cart_id, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart item not found"))?;
    services::ensure_in_stock(payload.quantity, stock)?;
    repo::set_quantity_tx(&mut tx, item_id, payload.quantity).await?;
    tx.commit().await?;

    Ok(Json(load_view(&state, Some(cart_id)).await?))
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<CartView>> {
    let cart_id = cart_of(&state, &user).await?;
    if !repo::remove_item(&state.db, cart_id, item_id).await? {
        return Err(AppError::not_found("Cart item not found"));
    }
    Ok(Json(load_view(&state, Some(cart_id)).await?))
}

#[instrument(skip(state))]
pub async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<CartView>> {
    let cart_id = repo::find_cart_id(&state.db, user.id).await?;
    if let Some(id) = cart_id {
        let removed = repo::clear(&state.db, id).await?;
        info!(user_id = %user.id, removed, "cart cleared");
    }
    Ok(Json(load_view(&state, cart_id).await?))
}
