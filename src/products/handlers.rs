use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    AdjustStockRequest, CreateProductRequest, InventoryHistory, InventoryQuery, ListProductsQuery,
    UpdateProductRequest,
};
use super::inventory::{self, MovementKind, NewMovement};
use super::repo::{self, Product, ProductFields};
use super::services;
use crate::{
    auth::AdminUser,
    error::{AppError, AppResult},
    params::{day_range, Paged},
    state::AppState,
    suppliers,
};

const HISTORY_DEFAULT_DAYS: i64 = 30;

/// Reads are public; writes require an admin token.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/categories", get(list_categories))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/stock", post(adjust_stock))
        .route("/products/:id/inventory", get(inventory_history))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ListProductsQuery>,
) -> AppResult<Json<Paged<Product>>> {
    let (filter, page) = q.split();
    let (items, total) = repo::list(&state.db, &filter, page.limit, page.offset).await?;
    Ok(Json(Paged {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(repo::categories(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    repo::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Product not found"))
}

async fn ensure_supplier(state: &AppState, fields: &ProductFields) -> AppResult<()> {
    if let Some(supplier_id) = fields.supplier_id {
        if !suppliers::repo::exists(&state.db, supplier_id).await? {
            return Err(AppError::bad_request("Supplier does not exist"));
        }
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let fields = payload.into_fields()?;
    ensure_supplier(&state, &fields).await?;

    let mut tx = state.db.begin().await?;
    let product = repo::insert(&mut *tx, &fields).await?;
    inventory::record(
        &mut *tx,
        &NewMovement {
            product_id: product.id,
            kind: MovementKind::Adjustment,
            quantity: product.stock,
            stock_after: product.stock,
            order_id: None,
            note: Some("initial stock"),
        },
    )
    .await?;
    tx.commit().await?;

    info!(product_id = %product.id, by = %admin_id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<Product>> {
    let current = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    let fields = payload.apply(current)?;
    ensure_supplier(&state, &fields).await?;

    let mut tx = state.db.begin().await?;
    let previous = inventory::lock_stock_tx(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    let product = repo::update(&mut *tx, id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    inventory::record(
        &mut *tx,
        &NewMovement {
            product_id: id,
            kind: MovementKind::Adjustment,
            quantity: product.stock - previous,
            stock_after: product.stock,
            order_id: None,
            note: Some("product update"),
        },
    )
    .await?;
    tx.commit().await?;

    info!(product_id = %id, by = %admin_id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Product not found"));
    }
    info!(product_id = %id, by = %admin_id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Receives (positive) or writes off (negative) stock.
#[instrument(skip(state, payload))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> AppResult<Json<Product>> {
    let note = payload.note();

    let mut tx = state.db.begin().await?;
    let stock = inventory::lock_stock_tx(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    let next = services::adjusted_stock(stock, payload.quantity)?;
    inventory::set_stock_tx(&mut tx, id, next).await?;
    inventory::record(
        &mut *tx,
        &NewMovement {
            product_id: id,
            kind: MovementKind::Adjustment,
            quantity: payload.quantity,
            stock_after: next,
            order_id: None,
            note: note.as_deref(),
        },
    )
    .await?;
    tx.commit().await?;

    info!(product_id = %id, by = %admin_id, delta = payload.quantity, stock = next, "stock adjusted");
    repo::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Product not found"))
}

#[instrument(skip(state))]
pub async fn inventory_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Query(q): Query<InventoryQuery>,
) -> AppResult<Json<InventoryHistory>> {
    let (start, end) = day_range(
        q.start_date.as_deref(),
        q.end_date.as_deref(),
        HISTORY_DEFAULT_DAYS,
    )?;
    let product = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    let movements = inventory::history(&state.db, id, start, end).await?;
    Ok(Json(InventoryHistory {
        product_id: id,
        stock: product.stock,
        movements,
    }))
}
