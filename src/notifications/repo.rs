use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Order,
    Payment,
    Shipment,
    System,
    Promotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
    Archived,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub metadata: Json<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

const COLUMNS: &str = "id, user_id, kind, title, message, status, metadata, created_at";

pub async fn insert<'e>(db: impl PgExecutor<'e>, n: &NewNotification) -> anyhow::Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO notifications (user_id, kind, title, message, metadata)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(n.user_id)
    .bind(n.kind)
    .bind(&n.title)
    .bind(&n.message)
    .bind(Json(&n.metadata))
    .fetch_one(db)
    .await?;
    Ok(id)
}

pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    status: Option<NotificationStatus>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Notification>, i64)> {
    let rows = sqlx::query_as::<_, Notification>(&format!(
        r#"
        SELECT {COLUMNS} FROM notifications
         WHERE user_id = $1 AND ($2::notification_status IS NULL OR status = $2)
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4
        "#
    ))
    .bind(user_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM notifications
         WHERE user_id = $1 AND ($2::notification_status IS NULL OR status = $2)
        "#,
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(db)
    .await?;

    Ok((rows, total))
}

pub async fn unread_count(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND status = 'unread'",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(n)
}

/// Sets the status of one of the user's notifications.
pub async fn set_status(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    status: NotificationStatus,
) -> anyhow::Result<Option<Notification>> {
    let row = sqlx::query_as::<_, Notification>(&format!(
        r#"
        UPDATE notifications SET status = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(status)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn mark_all_read(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(
        r#"
        UPDATE notifications SET status = 'read', updated_at = now()
         WHERE user_id = $1 AND status = 'unread'
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}
