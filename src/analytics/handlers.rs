use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::repo::{self, LowStockProduct};
use super::services::{self, SalesSummary};
use crate::{
    auth::AdminUser,
    error::{AppError, AppResult},
    params::day_range,
    products,
    state::AppState,
};

const SALES_DEFAULT_DAYS: i64 = 30;

/// Every route is admin-only.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/analytics/sales", get(sales))
        .route("/admin/analytics/products/:id", get(product))
        .route("/admin/analytics/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductReport {
    pub product_id: Uuid,
    pub name: String,
    pub revenue: Decimal,
    pub units_sold: i64,
    pub order_count: i64,
    pub stock: i32,
    pub stock_turnover: Decimal,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub users: i64,
    pub products: i64,
    pub orders_by_status: BTreeMap<&'static str, i64>,
    pub low_stock_threshold: i32,
    pub low_stock: Vec<LowStockProduct>,
    pub open_tickets: i64,
}

#[instrument(skip(state))]
pub async fn sales(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<SalesQuery>,
) -> AppResult<Json<SalesSummary>> {
    let (start, end) = day_range(
        q.start_date.as_deref(),
        q.end_date.as_deref(),
        SALES_DEFAULT_DAYS,
    )?;
    let lines = repo::sale_lines(&state.db, start, end).await?;
    Ok(Json(services::summarize(&lines, start, end)))
}

#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductReport>> {
    let product = products::repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    let sales = repo::product_sales(&state.db, id).await?;
    Ok(Json(ProductReport {
        product_id: product.id,
        name: product.name,
        revenue: sales.revenue,
        units_sold: sales.units_sold,
        order_count: sales.order_count,
        stock: product.stock,
        stock_turnover: services::stock_turnover(sales.units_sold, product.stock),
    }))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Dashboard>> {
    let threshold = state.config.low_stock_threshold;
    let orders_by_status = repo::orders_by_status(&state.db)
        .await?
        .into_iter()
        .map(|(status, n)| (status.as_str(), n))
        .collect();

    Ok(Json(Dashboard {
        users: repo::count_users(&state.db).await?,
        products: repo::count_products(&state.db).await?,
        orders_by_status,
        low_stock_threshold: threshold,
        low_stock: repo::low_stock(&state.db, threshold).await?,
        open_tickets: repo::open_tickets(&state.db).await?,
    }))
}
