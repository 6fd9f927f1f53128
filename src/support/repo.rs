use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub description: String,
    pub category: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub assigned_to: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub category: String,
    pub priority: TicketPriority,
}

#[derive(Debug, Clone)]
pub struct TicketChanges {
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: String,
    pub assigned_to: Option<Uuid>,
    pub resolved_at: Option<OffsetDateTime>,
}

/// Admin listing filter. `search` is an escaped ILIKE pattern.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
}

const COLUMNS: &str = "t.id, t.user_id, t.subject, t.description, t.category, t.status, \
     t.priority, t.assigned_to, t.created_at, t.updated_at, t.resolved_at";

const FILTER_SQL: &str = r#"
    ($1::uuid IS NULL OR t.user_id = $1)
    AND ($2::ticket_status IS NULL OR t.status = $2)
    AND ($3::uuid IS NULL OR t.assigned_to = $3)
    AND ($4::text IS NULL
         OR t.subject ILIKE $4
         OR t.description ILIKE $4
         OR EXISTS (SELECT 1 FROM ticket_messages m WHERE m.ticket_id = t.id AND m.body ILIKE $4))
"#;

pub async fn create(db: &PgPool, user_id: Uuid, new: &NewTicket) -> anyhow::Result<Ticket> {
    let mut tx = db.begin().await?;
    let ticket = sqlx::query_as::<_, Ticket>(&format!(
        r#"
        INSERT INTO support_tickets AS t (user_id, subject, description, category, priority)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&new.subject)
    .bind(&new.description)
    .bind(&new.category)
    .bind(new.priority)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO ticket_messages (ticket_id, author_id, body) VALUES ($1, $2, $3)")
        .bind(ticket.id)
        .bind(user_id)
        .bind(&new.description)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(ticket)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Ticket>> {
    let row = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {COLUMNS} FROM support_tickets t WHERE t.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn messages(db: &PgPool, ticket_id: Uuid) -> anyhow::Result<Vec<TicketMessage>> {
    let rows = sqlx::query_as::<_, TicketMessage>(
        r#"
        SELECT id, ticket_id, author_id, body, created_at
          FROM ticket_messages
         WHERE ticket_id = $1
         ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(ticket_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list(
    db: &PgPool,
    filter: &TicketFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Ticket>, i64)> {
    let rows = sqlx::query_as::<_, Ticket>(&format!(
        r#"
        SELECT {COLUMNS} FROM support_tickets t
         WHERE {FILTER_SQL}
         ORDER BY t.created_at DESC
         LIMIT $5 OFFSET $6
        "#
    ))
    .bind(filter.user_id)
    .bind(filter.status)
    .bind(filter.assigned_to)
    .bind(filter.search.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM support_tickets t WHERE {FILTER_SQL}"
    ))
    .bind(filter.user_id)
    .bind(filter.status)
    .bind(filter.assigned_to)
    .bind(filter.search.as_deref())
    .fetch_one(db)
    .await?;

    Ok((rows, total))
}

pub async fn add_message(
    db: &PgPool,
    ticket_id: Uuid,
    author_id: Uuid,
    body: &str,
) -> anyhow::Result<TicketMessage> {
    let mut tx = db.begin().await?;
    let message = sqlx::query_as::<_, TicketMessage>(
        r#"
        INSERT INTO ticket_messages (ticket_id, author_id, body)
        VALUES ($1, $2, $3)
        RETURNING id, ticket_id, author_id, body, created_at
        "#,
    )
    .bind(ticket_id)
    .bind(author_id)
    .bind(body)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE support_tickets SET updated_at = now() WHERE id = $1")
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(message)
}

pub async fn update(db: &PgPool, id: Uuid, c: &TicketChanges) -> anyhow::Result<Option<Ticket>> {
    let row = sqlx::query_as::<_, Ticket>(&format!(
        r#"
        UPDATE support_tickets AS t
           SET status = $2, priority = $3, category = $4, assigned_to = $5,
               resolved_at = $6, updated_at = now()
         WHERE t.id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(c.status)
    .bind(c.priority)
    .bind(&c.category)
    .bind(c.assigned_to)
    .bind(c.resolved_at)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn count_by_status(db: &PgPool) -> anyhow::Result<Vec<(TicketStatus, i64)>> {
    let rows = sqlx::query_as::<_, (TicketStatus, i64)>(
        "SELECT status, COUNT(*) FROM support_tickets GROUP BY status",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}
