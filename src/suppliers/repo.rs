use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::address::Address;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Json<Address>,
    pub is_active: bool,
    pub rating: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const SUPPLIER_COLUMNS: &str =
    "id, name, email, phone, address, is_active, rating, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SupplierFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub is_active: bool,
    pub rating: Decimal,
}

pub async fn list(db: &PgPool, active: Option<bool>) -> anyhow::Result<Vec<Supplier>> {
    let rows = sqlx::query_as::<_, Supplier>(&format!(
        "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE ($1::bool IS NULL OR is_active = $1) ORDER BY name"
    ))
    .bind(active)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Supplier>> {
    let row = sqlx::query_as::<_, Supplier>(&format!(
        "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM suppliers WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(found)
}

pub async fn insert(db: &PgPool, f: &SupplierFields) -> anyhow::Result<Supplier> {
    let row = sqlx::query_as::<_, Supplier>(&format!(
        r#"
        INSERT INTO suppliers (name, email, phone, address, is_active, rating)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {SUPPLIER_COLUMNS}
        "#
    ))
    .bind(&f.name)
    .bind(&f.email)
    .bind(&f.phone)
    .bind(Json(&f.address))
    .bind(f.is_active)
    .bind(f.rating)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, f: &SupplierFields) -> anyhow::Result<Option<Supplier>> {
    let row = sqlx::query_as::<_, Supplier>(&format!(
        r#"
        UPDATE suppliers
           SET name = $2, email = $3, phone = $4, address = $5,
               is_active = $6, rating = $7, updated_at = now()
         WHERE id = $1
        RETURNING {SUPPLIER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&f.name)
    .bind(&f.email)
    .bind(&f.phone)
    .bind(Json(&f.address))
    .bind(f.is_active)
    .bind(f.rating)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM suppliers WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}
