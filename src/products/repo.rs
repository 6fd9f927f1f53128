use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub stock: i32,
    pub category: String,
    pub supplier_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image_url, stock, category, supplier_id, created_at, updated_at";

/// Fields shared by insert and update.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub stock: i32,
    pub category: String,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub supplier_id: Option<Uuid>,
}

const FILTER_SQL: &str = r#"
    WHERE ($1::text IS NULL OR category = $1)
      AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)
      AND ($3::numeric IS NULL OR price >= $3)
      AND ($4::numeric IS NULL OR price <= $4)
      AND ($5::uuid IS NULL OR supplier_id = $5)
"#;

pub async fn list(
    db: &PgPool,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Product>, i64)> {
    let rows = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products {FILTER_SQL} ORDER BY created_at DESC LIMIT $6 OFFSET $7"
    ))
    .bind(filter.category.as_deref())
    .bind(filter.search.as_deref())
    .bind(filter.min_price)
    .bind(filter.max_price)
    .bind(filter.supplier_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {FILTER_SQL}"))
        .bind(filter.category.as_deref())
        .bind(filter.search.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.supplier_id)
        .fetch_one(db)
        .await?;

    Ok((rows, total))
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn categories(db: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM products ORDER BY category",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, f: &ProductFields) -> anyhow::Result<Product> {
    let row = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (name, description, price, image_url, stock, category, supplier_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&f.name)
    .bind(&f.description)
    .bind(f.price)
    .bind(&f.image_url)
    .bind(f.stock)
    .bind(&f.category)
    .bind(f.supplier_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
    f: &ProductFields,
) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products
           SET name = $2, description = $3, price = $4, image_url = $5,
               stock = $6, category = $7, supplier_id = $8, updated_at = now()
         WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&f.name)
    .bind(&f.description)
    .bind(f.price)
    .bind(&f.image_url)
    .bind(f.stock)
    .bind(&f.category)
    .bind(f.supplier_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}
