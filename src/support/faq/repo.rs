use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "faq_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FaqCategory {
    General,
    Orders,
    Payments,
    Shipping,
    Returns,
    Account,
    Technical,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: FaqCategory,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub views: i64,
    pub helpful_votes: i64,
    pub not_helpful_votes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields shared by insert and update.
#[derive(Debug, Clone)]
pub struct FaqFields {
    pub question: String,
    pub answer: String,
    pub category: FaqCategory,
    pub tags: Vec<String>,
    pub is_active: bool,
}

const COLUMNS: &str = "id, question, answer, category, tags, is_active, views, \
     helpful_votes, not_helpful_votes, created_at, updated_at";

/// `active_only` hides retired entries from the public listing.
pub async fn list(
    db: &PgPool,
    category: Option<FaqCategory>,
    active_only: bool,
) -> anyhow::Result<Vec<Faq>> {
    let rows = sqlx::query_as::<_, Faq>(&format!(
        r#"
        SELECT {COLUMNS} FROM faqs
         WHERE ($1::faq_category IS NULL OR category = $1)
           AND (NOT $2 OR is_active)
         ORDER BY category, created_at ASC
        "#
    ))
    .bind(category)
    .bind(active_only)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Active entries whose question, answer or tags match the ILIKE `pattern`.
pub async fn search(db: &PgPool, pattern: &str) -> anyhow::Result<Vec<Faq>> {
    let rows = sqlx::query_as::<_, Faq>(&format!(
        r#"
        SELECT {COLUMNS} FROM faqs
         WHERE is_active
           AND (question ILIKE $1
                OR answer ILIKE $1
                OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $1))
         ORDER BY helpful_votes DESC, views DESC, created_at ASC
        "#
    ))
    .bind(pattern)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Faq>> {
    let row = sqlx::query_as::<_, Faq>(&format!("SELECT {COLUMNS} FROM faqs WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Returns an active entry and counts the view.
pub async fn view(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Faq>> {
    let row = sqlx::query_as::<_, Faq>(&format!(
        "UPDATE faqs SET views = views + 1 WHERE id = $1 AND is_active RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn vote(db: &PgPool, id: Uuid, helpful: bool) -> anyhow::Result<Option<Faq>> {
    let row = sqlx::query_as::<_, Faq>(&format!(
        r#"
        UPDATE faqs
           SET helpful_votes = helpful_votes + CASE WHEN $2 THEN 1 ELSE 0 END,
               not_helpful_votes = not_helpful_votes + CASE WHEN $2 THEN 0 ELSE 1 END
         WHERE id = $1 AND is_active
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(helpful)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert(db: &PgPool, f: &FaqFields) -> anyhow::Result<Faq> {
    let row = sqlx::query_as::<_, Faq>(&format!(
        r#"
        INSERT INTO faqs (question, answer, category, tags, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&f.question)
    .bind(&f.answer)
    .bind(f.category)
    .bind(&f.tags)
    .bind(f.is_active)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, f: &FaqFields) -> anyhow::Result<Option<Faq>> {
    let row = sqlx::query_as::<_, Faq>(&format!(
        r#"
        UPDATE faqs
           SET question = $2, answer = $3, category = $4, tags = $5, is_active = $6,
               updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&f.question)
    .bind(&f.answer)
    .bind(f.category)
    .bind(&f.tags)
    .bind(f.is_active)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM faqs WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}
