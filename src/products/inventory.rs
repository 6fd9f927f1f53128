//! Stock movement ledger. Every write to `products.stock` appends a row here
//! in the same transaction.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "inventory_movement_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Adjustment,
    Sale,
    Cancellation,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Movement {
    pub id: i64,
    pub product_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub stock_after: i32,
    pub order_id: Option<Uuid>,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub product_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub stock_after: i32,
    pub order_id: Option<Uuid>,
    pub note: Option<&'a str>,
}

pub async fn record<'e>(db: impl PgExecutor<'e>, m: &NewMovement<'_>) -> anyhow::Result<()> {
    if m.quantity == 0 {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (product_id, kind, quantity, stock_after, order_id, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(m.product_id)
    .bind(m.kind)
    .bind(m.quantity)
    .bind(m.stock_after)
    .bind(m.order_id)
    .bind(m.note)
    .execute(db)
    .await?;
    Ok(())
}

/// Locks the product row and returns its stock.
pub async fn lock_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> anyhow::Result<Option<i32>> {
    let stock = sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(stock)
}

pub async fn set_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    stock: i32,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE products SET stock = $2, updated_at = now() WHERE id = $1")
        .bind(product_id)
        .bind(stock)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Movements in `[from, to)`, newest first.
pub async fn history(
    db: &PgPool,
    product_id: Uuid,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<Movement>> {
    let rows = sqlx::query_as::<_, Movement>(
        r#"
        SELECT id, product_id, kind, quantity, stock_after, order_id, note, created_at
          FROM inventory_movements
         WHERE product_id = $1 AND created_at >= $2 AND created_at < $3
         ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(product_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
