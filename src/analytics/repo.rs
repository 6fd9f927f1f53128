use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::orders::repo::OrderStatus;

/// One order line inside the reporting window.
#[derive(Debug, Clone, FromRow)]
pub struct SaleLine {
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductSales {
    pub revenue: Decimal,
    pub units_sold: i64,
    pub order_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
}

pub async fn sale_lines(
    db: &PgPool,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<SaleLine>> {
    let rows = sqlx::query_as::<_, SaleLine>(
        r#"
        SELECT oi.order_id, oi.product_id, oi.name, oi.category, oi.unit_price, oi.quantity
          FROM order_items oi
          JOIN orders o ON o.id = oi.order_id
         WHERE o.status <> 'cancelled'
           AND o.created_at >= $1 AND o.created_at < $2
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn product_sales(db: &PgPool, product_id: Uuid) -> anyhow::Result<ProductSales> {
    let row = sqlx::query_as::<_, ProductSales>(
        r#"
        SELECT COALESCE(SUM(oi.unit_price * oi.quantity), 0) AS revenue,
               COALESCE(SUM(oi.quantity), 0)::BIGINT AS units_sold,
               COUNT(DISTINCT oi.order_id) AS order_count
          FROM order_items oi
          JOIN orders o ON o.id = oi.order_id
         WHERE oi.product_id = $1 AND o.status <> 'cancelled'
        "#,
    )
    .bind(product_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn count_users(db: &PgPool) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await?)
}

pub async fn count_products(db: &PgPool) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(db)
        .await?)
}

pub async fn orders_by_status(db: &PgPool) -> anyhow::Result<Vec<(OrderStatus, i64)>> {
    let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
        "SELECT status, COUNT(*) FROM orders GROUP BY status",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn low_stock(db: &PgPool, threshold: i32) -> anyhow::Result<Vec<LowStockProduct>> {
    let rows = sqlx::query_as::<_, LowStockProduct>(
        "SELECT id, name, stock FROM products WHERE stock <= $1 ORDER BY stock ASC, name ASC",
    )
    .bind(threshold)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn open_tickets(db: &PgPool) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM support_tickets WHERE status IN ('open', 'in_progress')",
    )
    .fetch_one(db)
    .await?)
}
