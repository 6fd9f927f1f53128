use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// A cart line joined with its product's current price and stock.
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image_url: String,
    pub unit_price: Decimal,
    pub stock: i32,
    pub quantity: i32,
}

pub async fn find_cart_id(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Uuid>> {
    let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(id)
}

pub async fn ensure_cart_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> anyhow::Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO carts (user_id) VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
        RETURNING id
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

pub async fn lines(db: &PgPool, cart_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.id, ci.product_id, p.name, p.image_url, p.price AS unit_price, p.stock, ci.quantity
          FROM cart_items ci
          JOIN products p ON p.id = ci.product_id
         WHERE ci.cart_id = $1
         ORDER BY ci.created_at ASC
        "#,
    )
    .bind(cart_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Locks the product row and returns its stock.
pub async fn product_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> anyhow::Result<Option<i32>> {
    let stock = sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1 FOR SHARE")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(stock)
}

/// Quantity already in the cart for `product_id`, locking the line.
pub async fn line_quantity_tx(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: Uuid,
    product_id: Uuid,
) -> anyhow::Result<Option<i32>> {
    let quantity = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2 FOR UPDATE",
    )
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(quantity)
}

/// Adds `quantity` to the product's line, creating it when missing.
/// Returns the merged quantity.
pub async fn add_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<i32> {
    let merged = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO cart_items (cart_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING quantity
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&mut **tx)
    .await?;
    Ok(merged)
}

/// Stock of the product behind a cart line, or `None` if the line is not in the cart.
pub async fn line_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: Uuid,
    item_id: Uuid,
) -> anyhow::Result<Option<i32>> {
    let stock = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT p.stock
          FROM cart_items ci
          JOIN products p ON p.id = ci.product_id
         WHERE ci.id = $2 AND ci.cart_id = $1
           FOR UPDATE OF ci
        "#,
    )
    .bind(cart_id)
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(stock)
}

pub async fn set_quantity_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
        .bind(item_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn remove_item(db: &PgPool, cart_id: Uuid, item_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id)
        .bind(cart_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn clear(db: &PgPool, cart_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
