use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Currency {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub exchange_rate: Decimal,
    pub is_default: bool,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RatePoint {
    pub rate: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CurrencyFields {
    pub name: String,
    pub symbol: String,
    pub exchange_rate: Decimal,
    pub is_active: bool,
}

const COLUMNS: &str =
    "id, code, name, symbol, exchange_rate, is_default, is_active, last_updated, created_at";

pub async fn list_active(db: &PgPool) -> anyhow::Result<Vec<Currency>> {
    let rows = sqlx::query_as::<_, Currency>(&format!(
        "SELECT {COLUMNS} FROM currencies WHERE is_active ORDER BY code"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_default(db: &PgPool) -> anyhow::Result<Option<Currency>> {
    let row = sqlx::query_as::<_, Currency>(&format!(
        "SELECT {COLUMNS} FROM currencies WHERE is_default"
    ))
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn find_active(db: &PgPool, code: &str) -> anyhow::Result<Option<Currency>> {
    let row = sqlx::query_as::<_, Currency>(&format!(
        "SELECT {COLUMNS} FROM currencies WHERE code = $1 AND is_active"
    ))
    .bind(code)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

async fn record_rate<'e>(
    db: impl PgExecutor<'e>,
    currency_id: Uuid,
    rate: Decimal,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO currency_rates (currency_id, rate) VALUES ($1, $2)")
        .bind(currency_id)
        .bind(rate)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn insert(db: &PgPool, code: &str, f: &CurrencyFields) -> anyhow::Result<Currency> {
    let mut tx = db.begin().await?;
    let currency = sqlx::query_as::<_, Currency>(&format!(
        r#"
        INSERT INTO currencies (code, name, symbol, exchange_rate, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(code)
    .bind(&f.name)
    .bind(&f.symbol)
    .bind(f.exchange_rate)
    .bind(f.is_active)
    .fetch_one(&mut *tx)
    .await?;
    record_rate(&mut *tx, currency.id, currency.exchange_rate).await?;
    tx.commit().await?;
    Ok(currency)
}

pub async fn lock_tx(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> anyhow::Result<Option<Currency>> {
    let row = sqlx::query_as::<_, Currency>(&format!(
        "SELECT {COLUMNS} FROM currencies WHERE code = $1 FOR UPDATE"
    ))
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

/// Writes the fields, recording the rate in history when it changed.
pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    current: &Currency,
    f: &CurrencyFields,
) -> anyhow::Result<Currency> {
    let rate_changed = current.exchange_rate != f.exchange_rate;
    let currency = sqlx::query_as::<_, Currency>(&format!(
        r#"
        UPDATE currencies
           SET name = $2, symbol = $3, exchange_rate = $4, is_active = $5,
               last_updated = CASE WHEN $6 THEN now() ELSE last_updated END
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(current.id)
    .bind(&f.name)
    .bind(&f.symbol)
    .bind(f.exchange_rate)
    .bind(f.is_active)
    .bind(rate_changed)
    .fetch_one(&mut **tx)
    .await?;
    if rate_changed {
        record_rate(&mut **tx, currency.id, currency.exchange_rate).await?;
    }
    Ok(currency)
}

/// Makes `code` the only default. Clearing first keeps the partial unique
/// index satisfied row by row.
pub async fn set_default_tx(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> anyhow::Result<Option<Currency>> {
    sqlx::query("UPDATE currencies SET is_default = FALSE WHERE is_default AND code <> $1")
        .bind(code)
        .execute(&mut **tx)
        .await?;
    let row = sqlx::query_as::<_, Currency>(&format!(
        r#"
        UPDATE currencies SET is_default = TRUE
         WHERE code = $1 AND is_active
        RETURNING {COLUMNS}
        "#
    ))
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

/// Applies a `code -> rate` table to every known currency. Returns how many changed.
pub async fn apply_rates(db: &PgPool, rates: &HashMap<String, Decimal>) -> anyhow::Result<u64> {
    let mut tx = db.begin().await?;
    let known = sqlx::query_as::<_, (Uuid, String, Decimal)>(
        "SELECT id, code, exchange_rate FROM currencies FOR UPDATE",
    )
    .fetch_all(&mut *tx)
    .await?;

    let mut updated = 0;
    for (id, code, current) in known {
        let Some(&rate) = rates.get(&code) else {
            continue;
        };
        if rate <= Decimal::ZERO {
            continue;
        }
        sqlx::query("UPDATE currencies SET exchange_rate = $2, last_updated = now() WHERE id = $1")
            .bind(id)
            .bind(rate)
            .execute(&mut *tx)
            .await?;
        if rate != current {
            record_rate(&mut *tx, id, rate).await?;
            updated += 1;
        }
    }
    tx.commit().await?;
    Ok(updated)
}

pub async fn history(
    db: &PgPool,
    currency_id: Uuid,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<RatePoint>> {
    let rows = sqlx::query_as::<_, RatePoint>(
        r#"
        SELECT rate, recorded_at FROM currency_rates
         WHERE currency_id = $1 AND recorded_at >= $2 AND recorded_at < $3
         ORDER BY recorded_at ASC, id ASC
        "#,
    )
    .bind(currency_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
