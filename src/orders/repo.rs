use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::address::Address;
use crate::products::inventory::{self, MovementKind, NewMovement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total: Decimal,
    pub shipping_address: Json<Address>,
    pub tracking_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub category: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// A cart line with its product row locked for checkout.
#[derive(Debug, Clone, FromRow)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub name: String,
    pub category: String,
    pub unit_price: Decimal,
    pub stock: i32,
    pub quantity: i32,
}

const ORDER_COLUMNS: &str =
    "id, user_id, status, total, shipping_address, tracking_number, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, name, category, unit_price, quantity";

pub async fn lock_cart_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> anyhow::Result<Vec<CheckoutLine>> {
    let rows = sqlx::query_as::<_, CheckoutLine>(
        r#"
        SELECT p.id AS product_id, p.name, p.category, p.price AS unit_price, p.stock, ci.quantity
          FROM cart_items ci
          JOIN carts c ON c.id = ci.cart_id
          JOIN products p ON p.id = ci.product_id
         WHERE c.user_id = $1
         ORDER BY p.id
           FOR UPDATE OF p
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

pub async fn insert_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    total: Decimal,
    shipping_address: &Address,
) -> anyhow::Result<Order> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        INSERT INTO orders (user_id, total, shipping_address)
        VALUES ($1, $2, $3)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(total)
    .bind(Json(shipping_address))
    .fetch_one(&mut **tx)
    .await?;
    Ok(order)
}

/// Snapshots the line into the order and takes its quantity out of stock.
pub async fn insert_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    line: &CheckoutLine,
) -> anyhow::Result<OrderItem> {
    let item = sqlx::query_as::<_, OrderItem>(&format!(
        r#"
        INSERT INTO order_items (order_id, product_id, name, category, unit_price, quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(&line.category)
    .bind(line.unit_price)
    .bind(line.quantity)
    .fetch_one(&mut **tx)
    .await?;

    let stock_after = sqlx::query_scalar::<_, i32>(
        "UPDATE products SET stock = stock - $2, updated_at = now() WHERE id = $1 RETURNING stock",
    )
    .bind(line.product_id)
    .bind(line.quantity)
    .fetch_one(&mut **tx)
    .await?;

    inventory::record(
        &mut **tx,
        &NewMovement {
            product_id: line.product_id,
            kind: MovementKind::Sale,
            quantity: -line.quantity,
            stock_after,
            order_id: Some(order_id),
            note: None,
        },
    )
    .await?;

    Ok(item)
}

/// Removes the ordered lines from the user's cart. Lines for other products
/// stay, since checkout never locked them.
pub async fn clear_cart_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    product_ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM cart_items ci
         USING carts c
         WHERE c.id = ci.cart_id AND c.user_id = $1 AND ci.product_id = ANY($2)
        "#,
    )
    .bind(user_id)
    .bind(product_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn lock_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(order)
}

pub async fn set_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: OrderStatus,
    tracking_number: Option<&str>,
) -> anyhow::Result<Order> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders
           SET status = $2,
               tracking_number = COALESCE($3, tracking_number),
               updated_at = now()
         WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .bind(tracking_number)
    .fetch_one(&mut **tx)
    .await?;
    Ok(order)
}

/// Puts the order's quantities back on the shelf. Deleted products are skipped.
pub async fn restore_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> anyhow::Result<u64> {
    let res = sqlx::query(
        r#"
        WITH restored AS (
            UPDATE products p
               SET stock = p.stock + oi.quantity, updated_at = now()
              FROM order_items oi
             WHERE oi.order_id = $1 AND p.id = oi.product_id
         RETURNING p.id, p.stock, oi.quantity
        )
        INSERT INTO inventory_movements (product_id, kind, quantity, stock_after, order_id)
        SELECT id, 'cancellation'::inventory_movement_kind, quantity, stock, $1 FROM restored
        "#,
    )
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(res.rows_affected())
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(order)
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_all(
    db: &PgPool,
    status: Option<OrderStatus>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Order>, i64)> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
         WHERE ($1::order_status IS NULL OR status = $1)
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3
        "#
    ))
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)",
    )
    .bind(status)
    .fetch_one(db)
    .await?;

    Ok((rows, total))
}

/// Items of every listed order, grouped by order id.
pub async fn items_for(
    db: &PgPool,
    order_ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, Vec<OrderItem>>> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY name"
    ))
    .bind(order_ids)
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in rows {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}
