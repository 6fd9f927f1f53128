use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateSupplierRequest, ListSuppliersQuery, UpdateSupplierRequest};
use super::repo::{self, Supplier};
use crate::{
    auth::AdminUser,
    error::{AppError, AppResult},
    params::Paged,
    products::repo::{self as products_repo, Product, ProductFilter},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route("/suppliers/:id/products", get(supplier_products))
}

#[instrument(skip(state))]
pub async fn list_suppliers(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<ListSuppliersQuery>,
) -> AppResult<Json<Vec<Supplier>>> {
    Ok(Json(repo::list(&state.db, q.active).await?))
}

#[instrument(skip(state))]
pub async fn get_supplier(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    repo::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Supplier not found"))
}

#[instrument(skip(state, payload))]
pub async fn create_supplier(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<CreateSupplierRequest>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let fields = payload.into_fields()?;
    let supplier = repo::insert(&state.db, &fields)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Supplier email already exists".into()),
            other => other,
        })?;
    info!(supplier_id = %supplier.id, by = %admin_id, "supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

#[instrument(skip(state, payload))]
pub async fn update_supplier(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> AppResult<Json<Supplier>> {
    let current = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Supplier not found"))?;
    let fields = payload.apply(current)?;
    let supplier = repo::update(&state.db, id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Supplier not found"))?;
    info!(supplier_id = %id, by = %admin_id, "supplier updated");
    Ok(Json(supplier))
}

#[instrument(skip(state))]
pub async fn delete_supplier(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Supplier not found"));
    }
    info!(supplier_id = %id, by = %admin_id, "supplier deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn supplier_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Paged<Product>>> {
    if !repo::exists(&state.db, id).await? {
        return Err(AppError::not_found("Supplier not found"));
    }
    let filter = ProductFilter {
        supplier_id: Some(id),
        ..Default::default()
    };
    let limit = crate::params::MAX_LIMIT;
    let (items, total) = products_repo::list(&state.db, &filter, limit, 0).await?;
    Ok(Json(Paged {
        items,
        total,
        limit,
        offset: 0,
    }))
}
