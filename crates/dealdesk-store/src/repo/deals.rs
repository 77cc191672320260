//! Deal repository.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use dealdesk_core::models::{Deal, DealStatus};
use dealdesk_core::DealdeskResult;

use crate::rows::DealRow;
use crate::{Conn, SqlxResultExt};

const COLUMNS: &str = "id, title, amount, status, needs_override, override_approved_at, \
     fm_review_at, created_by, created_at, details";

pub async fn insert(conn: &mut Conn, deal: &Deal) -> DealdeskResult<()> {
    sqlx::query(
        "INSERT INTO deals (id, title, amount, status, needs_override, created_by, created_at, details) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(deal.id)
    .bind(&deal.title)
    .bind(deal.amount)
    .bind(deal.status.as_str())
    .bind(deal.needs_override)
    .bind(deal.created_by)
    .bind(deal.created_at)
    .bind(&deal.details)
    .execute(conn)
    .await
    .db()?;
    Ok(())
}

pub async fn find_by_id(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Deal>> {
    let row = sqlx::query_as::<_, DealRow>(&format!("SELECT {COLUMNS} FROM deals WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .db()?;
    Ok(row.map(Deal::from))
}

pub async fn find_by_id_for_update(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Deal>> {
    let row = sqlx::query_as::<_, DealRow>(&format!(
        "SELECT {COLUMNS} FROM deals WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(Deal::from))
}

pub async fn update_status(conn: &mut Conn, id: Uuid, status: DealStatus) -> DealdeskResult<()> {
    sqlx::query("UPDATE deals SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn set_override_approved(
    conn: &mut Conn,
    id: Uuid,
    at: DateTime<Utc>,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE deals SET override_approved_at = $2 WHERE id = $1")
        .bind(id)
        .bind(at)
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn set_fm_review(conn: &mut Conn, id: Uuid, at: DateTime<Utc>) -> DealdeskResult<()> {
    sqlx::query("UPDATE deals SET fm_review_at = $2 WHERE id = $1")
        .bind(id)
        .bind(at)
        .execute(conn)
        .await
        .db()?;
    Ok(())
}
